use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use crate::error::{ChannelError, Result};

/// 通道选项的稳定标识符。
///
/// ## 设计目的（Why）
/// - 遵循 "domain + name" 命名法，让不同通道变体声明的选项键在全局可辨识、
///   可枚举，失败信息（`option_unsupported`）可直接携带键本身；
/// - `Cow<'static, str>` 允许常量键与动态注册并存，常量路径零分配。
///
/// ## 契约定义（What）
/// - **前置条件**：`domain` 与 `name` 非空，推荐 `[a-z0-9_.-]`；
/// - `Display` 形如 `domain::name`，作为日志与告警中的稳定键。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OptionKey {
    domain: Cow<'static, str>,
    name: Cow<'static, str>,
    summary: Cow<'static, str>,
}

impl OptionKey {
    /// 构造一个新的选项键。
    pub fn new<D, N, S>(domain: D, name: N, summary: S) -> Self
    where
        D: Into<Cow<'static, str>>,
        N: Into<Cow<'static, str>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            domain: domain.into(),
            name: name.into(),
            summary: summary.into(),
        }
    }

    /// 以静态字符串构造常量键，零分配。
    pub const fn from_static(
        domain: &'static str,
        name: &'static str,
        summary: &'static str,
    ) -> Self {
        Self {
            domain: Cow::Borrowed(domain),
            name: Cow::Borrowed(name),
            summary: Cow::Borrowed(summary),
        }
    }

    /// 返回选项所属业务域。
    #[inline]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// 返回选项名称。
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 返回面向人类的简短描述。
    #[inline]
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.domain, self.name)
    }
}

/// 选项取值的类型化载体。
///
/// ## 契约（What）
/// - 每个键约定唯一的取值变体；传入变体不符属于非法取值，
///   与“键不支持”（[`ChannelError::UnsupportedOption`]）是两类失败。
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum OptionValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    Text(Cow<'static, str>),
    Duration(Duration),
}

/// 所有通道变体共享的最小能力协商面。
///
/// ## 设计背景（Why）
/// - 通道变体各自声明（可能为空的）受支持键集；空集是常见且合法的答案，
///   本层的两个适配器都不声明任何键；
/// - 不支持的键必须以可识别的错误种类失败，调用方据此与瞬时 I/O
///   失败分支，而不是猜测。
///
/// ## 契约（What）
/// - `get_option` / `set_option`：对受支持键执行窄范围的行为查询或调整；
///   未声明的键返回 [`ChannelError::UnsupportedOption`]；
/// - `options()`：枚举受支持键集；返回空切片即“无任何选项”。
pub trait Configurable {
    /// 查询选项当前取值。
    fn get_option(&self, key: &OptionKey) -> Result<OptionValue>;

    /// 调整选项取值。
    fn set_option(&self, key: &OptionKey, value: OptionValue) -> Result<()>;

    /// 枚举本变体声明的选项键。
    fn options(&self) -> &[OptionKey];
}

/// 构造“选项不支持”错误的统一入口，供各 `Configurable` 实现复用。
pub fn unsupported_option(key: &OptionKey) -> ChannelError {
    ChannelError::UnsupportedOption { key: key.clone() }
}

/// 基于一份配置产出实例的工厂；`create` 之后配置即冻结。
///
/// ## 契约（What）
/// - `create()`：按当前配置构造实例；
/// - **后置条件**：成功或失败各一次机会——再次调用返回
///   [`ChannelError::InvalidState`]，实例不可被重复创建；
/// - 工厂本身实现 [`Configurable`]，创建前可按键调整配置。
pub trait ConfigurableFactory<T>: Configurable {
    /// 按配置创建实例；二次调用失败。
    fn create(&self) -> Result<T>;
}
