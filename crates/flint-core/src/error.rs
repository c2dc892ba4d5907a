use std::io;

use thiserror::Error;

use crate::options::OptionKey;

/// 报文聚合（gather 仿真）允许的最大载荷字节数。
///
/// # 设计说明（Why）
/// - 单个 IPv4 UDP 报文最多承载 65 507 字节（64 KiB 减去 IP 与 UDP 头部），
///   超过该值的聚合发送必然失败，不如在拷贝发生之前就拒绝；
/// - 上限检查先于任何暂存缓冲分配执行，是聚合路径必须保持的契约。
pub const MAX_DATAGRAM_PAYLOAD: usize = 65_507;

/// `ChannelError` 是就绪通道层跨适配器共享的稳定错误域。
///
/// # 设计背景（Why）
/// - 调用方需要在“传输 I/O 失败”“能力不支持”“尺寸越界”之间精确分支：
///   前者可能值得重试，后两者重试无意义；
/// - 每个分支映射一个稳定错误码（`channel.*`），日志与告警按码聚合，
///   不必解析人类可读消息。
///
/// # 契约说明（What）
/// - `Io`：对底层资源的读/写/关闭失败，原始 [`io::Error`] 保留为根因；
/// - `UnsupportedOption`：通道变体未声明该选项键，区别于非法取值与 I/O 失败；
/// - `UnsupportedOperation`：通道变体不具备该能力（组播加入、无连接通道的
///   半关闭），显式报错而非静默空操作；
/// - `MessageTooLarge`：聚合发送的总字节数超过 [`MAX_DATAGRAM_PAYLOAD`]，
///   在任何缓冲拷贝之前返回；
/// - `InvalidState`：对象生命周期违规，例如对可配置工厂二次调用 `create`。
///
/// # 风险提示（Trade-offs）
/// - “登记已取消”不在此枚举之列：取消竞态是常态而非错误，
///   由 [`crate::event::InterestUpdate`] 作为命名结果承载。
#[derive(Debug, Error)]
pub enum ChannelError {
    /// 底层传输资源上的一次 I/O 操作失败。
    #[error("transport I/O failure: {0}")]
    Io(#[from] io::Error),

    /// 通道变体不支持该选项键。
    #[error("option `{key}` is not supported by this channel")]
    UnsupportedOption {
        /// 被拒绝的选项键。
        key: OptionKey,
    },

    /// 通道变体不具备该能力。
    #[error("operation not supported: {operation}")]
    UnsupportedOperation {
        /// 被拒绝的操作名，稳定字符串。
        operation: &'static str,
    },

    /// 聚合发送的总尺寸超出单个报文可承载的上限。
    #[error("gathered payload of {total} bytes exceeds the {max}-byte datagram limit")]
    MessageTooLarge {
        /// 聚合缓冲累计的字节数。
        total: u64,
        /// 允许的最大载荷。
        max: usize,
    },

    /// 对象处于不允许该调用的生命周期阶段。
    #[error("invalid state: {reason}")]
    InvalidState {
        /// 违规原因，稳定字符串。
        reason: &'static str,
    },
}

impl ChannelError {
    /// 返回该错误的稳定错误码。
    ///
    /// # 契约（What）
    /// - 码值遵循 `<域>.<语义>` 约定且永不变更，适合作为日志与指标的聚合键；
    /// - 人类可读消息（`Display`）可以演进，错误码不可以。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "channel.io",
            Self::UnsupportedOption { .. } => "channel.option_unsupported",
            Self::UnsupportedOperation { .. } => "channel.operation_unsupported",
            Self::MessageTooLarge { .. } => "channel.message_too_large",
            Self::InvalidState { .. } => "channel.invalid_state",
        }
    }

    /// 判断错误是否属于“能力不支持”类别（选项或操作）。
    ///
    /// 调用方据此与瞬时 I/O 失败区分：前者换条路径，后者可考虑重试。
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedOption { .. } | Self::UnsupportedOperation { .. }
        )
    }

    /// 构造“操作不支持”错误的便捷入口。
    pub fn unsupported_operation(operation: &'static str) -> Self {
        Self::UnsupportedOperation { operation }
    }
}

/// 本层统一的返回值别名，默认错误类型为 [`ChannelError`]。
///
/// # 设计意图（Why）
/// - 与核心契约保持一致的错误边界，避免各处重复书写 `Result<_, ChannelError>`；
/// - 第二个泛型参数保留给需要自定义错误域的下游。
pub type Result<T, E = ChannelError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionKey;

    #[test]
    fn codes_are_stable() {
        let io = ChannelError::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert_eq!(io.code(), "channel.io");

        let option = ChannelError::UnsupportedOption {
            key: OptionKey::new("channel", "nodelay", "无延迟发送"),
        };
        assert_eq!(option.code(), "channel.option_unsupported");

        let operation = ChannelError::unsupported_operation("multicast join");
        assert_eq!(operation.code(), "channel.operation_unsupported");

        let oversize = ChannelError::MessageTooLarge {
            total: 70_000,
            max: MAX_DATAGRAM_PAYLOAD,
        };
        assert_eq!(oversize.code(), "channel.message_too_large");
    }

    #[test]
    fn unsupported_predicate_excludes_io() {
        let io = ChannelError::from(io::Error::new(io::ErrorKind::WouldBlock, "busy"));
        assert!(!io.is_unsupported());
        assert!(ChannelError::unsupported_operation("shutdown reads").is_unsupported());
    }

    #[test]
    fn io_source_is_preserved() {
        use std::error::Error as _;

        let err = ChannelError::from(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        let source = err.source().expect("I/O 根因必须保留在错误链上");
        assert!(source.to_string().contains("reset"));
    }
}
