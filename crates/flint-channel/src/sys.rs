//! 标准库与 `socket2` 资源到资源契约的适配。
//!
//! 这里只做薄封装：非阻塞语义、截断语义、关闭语义全部由底层资源
//! 原样透出，契约见 [`flint_core::resource`] 各 trait 的文档。
//! 契约 trait 定义在 `flint-core`，具体资源类型在这里以本地包装
//! 承载实现。

use std::io::{self, IoSlice, IoSliceMut, PipeReader, PipeWriter, Read, Write};
use std::mem::MaybeUninit;
use std::net::{SocketAddr, UdpSocket};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;

use flint_core::resource::{DatagramResource, SinkHalf, SourceHalf};

/// 匿名管道的读端。
pub struct PipeSourceHalf {
    pipe: PipeReader,
}

/// 匿名管道的写端。
pub struct PipeSinkHalf {
    pipe: PipeWriter,
}

/// 建立一对匿名管道半部，可直接交给流式通道装配。
pub fn pipe_halves() -> io::Result<(PipeSourceHalf, PipeSinkHalf)> {
    let (reader, writer) = io::pipe()?;
    Ok((
        PipeSourceHalf { pipe: reader },
        PipeSinkHalf { pipe: writer },
    ))
}

impl PipeSourceHalf {
    /// 包装一个已有的管道读端。
    pub fn new(pipe: PipeReader) -> Self {
        Self { pipe }
    }
}

impl PipeSinkHalf {
    /// 包装一个已有的管道写端。
    pub fn new(pipe: PipeWriter) -> Self {
        Self { pipe }
    }
}

impl SourceHalf for PipeSourceHalf {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(&mut self.pipe, buf)
    }

    fn read_vectored(&mut self, bufs: &mut [IoSliceMut<'_>]) -> io::Result<usize> {
        Read::read_vectored(&mut self.pipe, bufs)
    }

    fn close(&mut self) -> io::Result<()> {
        // 匿名管道没有独立的关闭操作，析构时释放描述符。
        Ok(())
    }

    fn as_raw_fd(&self) -> RawFd {
        self.pipe.as_raw_fd()
    }
}

impl SinkHalf for PipeSinkHalf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(&mut self.pipe, buf)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        Write::write_vectored(&mut self.pipe, bufs)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.pipe)
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn as_raw_fd(&self) -> RawFd {
        self.pipe.as_raw_fd()
    }
}

/// Unix 域流套接字的读半部。
///
/// 关闭时对套接字做 `shutdown(Read)`，写半部持有的克隆不受影响。
pub struct UnixSourceHalf {
    stream: UnixStream,
}

/// Unix 域流套接字的写半部。
///
/// 关闭时对套接字做 `shutdown(Write)`，对端由此观察到 EOF。
pub struct UnixSinkHalf {
    stream: UnixStream,
}

/// 把一条 Unix 域流套接字拆成读写两个半部。
///
/// ## 契约（What）
/// - 两个半部各持一个描述符克隆，指向同一条连接；
/// - 整条套接字被置为非阻塞，满足资源契约的前置条件。
pub fn unix_stream_halves(stream: UnixStream) -> io::Result<(UnixSourceHalf, UnixSinkHalf)> {
    stream.set_nonblocking(true)?;
    let writer = stream.try_clone()?;
    Ok((
        UnixSourceHalf { stream },
        UnixSinkHalf { stream: writer },
    ))
}

impl SourceHalf for UnixSourceHalf {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(&mut &self.stream, buf)
    }

    fn read_vectored(&mut self, bufs: &mut [IoSliceMut<'_>]) -> io::Result<usize> {
        Read::read_vectored(&mut &self.stream, bufs)
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown(std::net::Shutdown::Read)
    }

    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

impl SinkHalf for UnixSinkHalf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(&mut &self.stream, buf)
    }

    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        Write::write_vectored(&mut &self.stream, bufs)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut &self.stream)
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown(std::net::Shutdown::Write)
    }

    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

/// 标准库 UDP 套接字的数据报资源形态。
pub struct UdpResource {
    socket: UdpSocket,
}

impl UdpResource {
    /// 包装一个已绑定、已置为非阻塞的套接字。
    pub fn new(socket: UdpSocket) -> Self {
        Self { socket }
    }
}

/// 绑定一个非阻塞 UDP 套接字，可直接交给多点通道装配。
pub fn udp_resource(bind: SocketAddr) -> io::Result<UdpResource> {
    let socket = UdpSocket::bind(bind)?;
    socket.set_nonblocking(true)?;
    Ok(UdpResource { socket })
}

impl DatagramResource for UdpResource {
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf)
    }

    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, target)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }

    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

/// `socket2` 原始套接字的数据报资源形态，供需要在绑定前调套接字层
/// 参数的集成方使用。
pub struct RawSocketResource {
    socket: socket2::Socket,
}

impl RawSocketResource {
    /// 包装一个已绑定、已置为非阻塞的原始套接字。
    pub fn new(socket: socket2::Socket) -> Self {
        Self { socket }
    }
}

impl DatagramResource for RawSocketResource {
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        // SAFETY：`MaybeUninit<u8>` 与 `u8` 布局一致，且这里只会向缓冲
        // 写入、不读取未初始化字节。
        let uninit =
            unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) };
        let (len, addr) = self.socket.recv_from(uninit)?;
        let peer = addr.as_socket().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "peer address is not an IP endpoint")
        })?;
        Ok((len, peer))
    }

    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(buf, &target.into())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        let addr = self.socket.local_addr()?;
        addr.as_socket().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "local address is not an IP endpoint")
        })
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }

    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_halves_carry_bytes() {
        let (mut reader, mut writer) = pipe_halves().unwrap();
        assert_eq!(SinkHalf::write(&mut writer, &[1, 2, 3]).unwrap(), 3);
        let mut buf = [0u8; 8];
        assert_eq!(SourceHalf::read(&mut reader, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }

    #[test]
    fn unix_halves_split_and_shutdown() {
        let (a, b) = UnixStream::pair().unwrap();
        let (mut source, mut sink) = unix_stream_halves(a).unwrap();
        let (_, mut peer_sink) = unix_stream_halves(b).unwrap();

        assert_eq!(SinkHalf::write(&mut peer_sink, b"hi").unwrap(), 2);
        let mut buf = [0u8; 4];
        assert_eq!(SourceHalf::read(&mut source, &mut buf).unwrap(), 2);

        SinkHalf::close(&mut sink).unwrap();
    }

    #[test]
    fn udp_resource_is_nonblocking() {
        let socket = udp_resource("127.0.0.1:0".parse().unwrap()).unwrap();
        let mut buf = [0u8; 16];
        let err = DatagramResource::recv_from(&socket, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn raw_socket_resource_round_trips_on_loopback() {
        use socket2::{Domain, Protocol, Socket, Type};

        let raw = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).unwrap();
        raw.bind(&"127.0.0.1:0".parse::<SocketAddr>().unwrap().into())
            .unwrap();
        raw.set_nonblocking(true).unwrap();
        let resource = RawSocketResource::new(raw);
        let addr = DatagramResource::local_addr(&resource).unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(&[42], addr).unwrap();

        let mut buf = [0u8; 8];
        let mut received = None;
        for _ in 0..100 {
            match DatagramResource::recv_from(&resource, &mut buf) {
                Ok(result) => {
                    received = Some(result);
                    break;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
                Err(err) => panic!("unexpected receive failure: {err}"),
            }
        }
        let (len, from) = received.expect("datagram within the retry window");
        assert_eq!(len, 1);
        assert_eq!(from, sender.local_addr().unwrap());
        assert_eq!(buf[0], 42);
    }
}
