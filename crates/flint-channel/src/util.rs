use std::io;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use flint_core::ready::Direction;

/// 带毒化恢复的互斥量加锁。
///
/// 处理器恐慌（虽已被垫片隔离）仍可能毒化持锁路径；本层的锁只守护
/// 资源句柄，毒化后的内部状态依然一致，直接取回即可。
pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 带毒化恢复的读写锁读取侧加锁。
pub(crate) fn read_lock<'a, T>(lock: &'a RwLock<T>) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 带毒化恢复的读写锁写入侧加锁。
pub(crate) fn write_lock<'a, T>(lock: &'a RwLock<T>) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 半部已关停后继续读写时返回的 I/O 错误。
pub(crate) fn half_closed(direction: Direction) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotConnected,
        match direction {
            Direction::Read => "read half has been shut down",
            Direction::Write => "write half has been shut down",
        },
    )
}
