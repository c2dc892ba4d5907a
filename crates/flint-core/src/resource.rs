use std::io::{self, IoSlice, IoSliceMut};
use std::net::SocketAddr;
use std::os::fd::RawFd;

/// 只读的单向流资源（管道源端、套接字读半部）。
///
/// ## 契约（What）
/// - 资源必须已处于非阻塞模式：无数据时 `read` 返回
///   [`io::ErrorKind::WouldBlock`]，EOF 返回 `Ok(0)`；
/// - `close` 释放资源本身；对不持有独立关闭语义的资源（匿名管道）
///   返回 `Ok(())`，随后的析构完成实际释放；
/// - 适配层不做任何缓冲，返回值与阻塞语义与底层资源完全一致。
pub trait SourceHalf: Send {
    /// 读取一次，至多填满 `buf`。
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// 散布读：按顺序填充多段缓冲。
    fn read_vectored(&mut self, bufs: &mut [IoSliceMut<'_>]) -> io::Result<usize>;

    /// 关闭资源；失败需如实上报，调用方决定抑制或传播。
    fn close(&mut self) -> io::Result<()>;

    /// 资源的原始文件描述符，用于向事件源登记兴趣。
    fn as_raw_fd(&self) -> RawFd;
}

/// 只写的单向流资源（管道汇端、套接字写半部）。
///
/// ## 契约（What）
/// - 非阻塞：缓冲区满时返回 [`io::ErrorKind::WouldBlock`]；
/// - `close` 的失败是有后果的——未冲刷的数据可能在这里丢失，复合通道的
///   关闭策略会把**写半部**的关闭失败传播给调用方。
pub trait SinkHalf: Send {
    /// 写入一次，返回实际接受的字节数。
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// 聚集写：一次提交多段缓冲。
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize>;

    /// 冲刷尚未提交的数据。
    fn flush(&mut self) -> io::Result<()>;

    /// 关闭资源；失败需如实上报。
    fn close(&mut self) -> io::Result<()>;

    /// 资源的原始文件描述符，用于向事件源登记兴趣。
    fn as_raw_fd(&self) -> RawFd;
}

/// 无连接、面向报文的资源（数据报套接字）。
///
/// ## 契约（What）
/// - 所有操作非阻塞：无报文可收、发送缓冲满时返回
///   [`io::ErrorKind::WouldBlock`]；
/// - `recv_from` 返回读取字节数与发送方地址；超出 `buf` 的报文尾部按
///   数据报语义截断；
/// - `send_to` 对单个报文不存在部分接受：要么整体入队，要么 0 字节；
/// - 并发安全：收与发可以从不同线程同时进行（`&self` 接口）。
pub trait DatagramResource: Send + Sync {
    /// 非阻塞接收一个报文。
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// 非阻塞向 `target` 发送一个报文。
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// 本地绑定地址。
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// 关闭资源；失败需如实上报。
    fn close(&self) -> io::Result<()>;

    /// 资源的原始文件描述符，用于向事件源登记兴趣。
    fn as_raw_fd(&self) -> RawFd;
}
