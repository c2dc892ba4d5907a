use core::fmt;
use core::ops::BitOr;

/// 就绪事件的方向。
///
/// ## 设计目的（Why）
/// - 通道适配器按方向各持一个就绪句柄，派发、挂起与等待都以方向为单位；
/// - 用枚举而非裸位值，避免调用点出现魔法常量。
///
/// ## 契约定义（What）
/// - `Read`：资源可读（对端有数据或已到 EOF）；
/// - `Write`：资源可写（发送缓冲有空间）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    /// 返回方向的稳定字符串描述，用于日志与诊断上下文。
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 读写兴趣位集。
///
/// ## 设计目的（Why）
/// - 事件源登记与恢复操作需要表达“读”“写”或两者的组合；
/// - 以最小位集实现，不引入额外依赖，语义与各平台 selector 的
///   兴趣位一一对应。
///
/// ## 契约定义（What）
/// - [`Interest::READ`] / [`Interest::WRITE`]：单方向兴趣；
/// - `|` 运算与 [`Interest::contains`]：组合与查询；
/// - 空兴趣不可表达——构造入口只有两个非空常量及其并集。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interest(u8);

impl Interest {
    /// 读兴趣。
    pub const READ: Interest = Interest(0b01);
    /// 写兴趣。
    pub const WRITE: Interest = Interest(0b10);

    /// 判断位集是否包含 `other` 的全部兴趣位。
    #[inline]
    pub const fn contains(self, other: Interest) -> bool {
        self.0 & other.0 == other.0
    }

    /// 判断位集是否含读兴趣。
    #[inline]
    pub const fn is_readable(self) -> bool {
        self.contains(Self::READ)
    }

    /// 判断位集是否含写兴趣。
    #[inline]
    pub const fn is_writable(self) -> bool {
        self.contains(Self::WRITE)
    }
}

impl BitOr for Interest {
    type Output = Interest;

    fn bitor(self, rhs: Interest) -> Interest {
        Interest(self.0 | rhs.0)
    }
}

impl From<Direction> for Interest {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Read => Interest::READ,
            Direction::Write => Interest::WRITE,
        }
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_readable(), self.is_writable()) {
            (true, true) => f.write_str("read|write"),
            (true, false) => f.write_str("read"),
            (false, true) => f.write_str("write"),
            (false, false) => f.write_str("none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_contains_both_directions() {
        let both = Interest::READ | Interest::WRITE;
        assert!(both.contains(Interest::READ));
        assert!(both.contains(Interest::WRITE));
        assert!(both.is_readable());
        assert!(both.is_writable());
    }

    #[test]
    fn direction_maps_to_single_bit() {
        assert_eq!(Interest::from(Direction::Read), Interest::READ);
        assert_eq!(Interest::from(Direction::Write), Interest::WRITE);
        assert!(!Interest::READ.is_writable());
        assert!(!Interest::WRITE.is_readable());
    }

    #[test]
    fn display_is_stable() {
        assert_eq!(Interest::READ.to_string(), "read");
        assert_eq!((Interest::READ | Interest::WRITE).to_string(), "read|write");
        assert_eq!(Direction::Write.to_string(), "write");
    }
}
