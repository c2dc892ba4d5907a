use std::sync::Mutex;

use flint_core::error::{ChannelError, Result};
use flint_core::options::{
    Configurable, ConfigurableFactory, OptionKey, OptionValue, unsupported_option,
};

use crate::util::lock;

/// 事件源的读就绪派发线程数。
pub const OPT_READ_EVENT_THREADS: OptionKey = OptionKey::from_static(
    "event_source",
    "read_threads",
    "number of threads dispatching read readiness",
);

/// 事件源的写就绪派发线程数。
pub const OPT_WRITE_EVENT_THREADS: OptionKey = OptionKey::from_static(
    "event_source",
    "write_threads",
    "number of threads dispatching write readiness",
);

static FACTORY_OPTIONS: [OptionKey; 2] = [OPT_READ_EVENT_THREADS, OPT_WRITE_EVENT_THREADS];

/// 事件源的静态装备参数。
///
/// ## 契约（What）
/// - `read_event_threads` 默认 2、`write_event_threads` 默认 1，
///   均须为正数；
/// - 本类型只承载参数，事件源本身由上层以这份配置自行装配。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventSourceConfig {
    name: String,
    read_event_threads: usize,
    write_event_threads: usize,
}

impl EventSourceConfig {
    /// 以默认线程配比创建一份配置。
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            read_event_threads: 2,
            write_event_threads: 1,
        }
    }

    /// 设置读就绪派发线程数。
    pub fn read_event_threads(mut self, count: usize) -> Self {
        self.read_event_threads = count;
        self
    }

    /// 设置写就绪派发线程数。
    pub fn write_event_threads(mut self, count: usize) -> Self {
        self.write_event_threads = count;
        self
    }

    /// 事件源的命名，用于日志与诊断标签。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 读就绪派发线程数。
    pub fn read_threads(&self) -> usize {
        self.read_event_threads
    }

    /// 写就绪派发线程数。
    pub fn write_threads(&self) -> usize {
        self.write_event_threads
    }
}

struct FactoryState {
    config: EventSourceConfig,
    created: bool,
}

/// 一次性的配置工厂：先通过选项面调参，`create()` 后冻结。
///
/// ## 契约（What）
/// - `create()` 只允许成功一次，再次调用以
///   [`ChannelError::InvalidState`]（`channel.invalid_state`）拒绝；
/// - 创建之后任何 `set_option` 同样被拒绝，`get_option` 仍可查询；
/// - 未列入 [`Configurable::options`] 的键以
///   `channel.option_unsupported` 拒绝，与取值非法、I/O 失败分属
///   不同错误类。
pub struct EventSourceConfigFactory {
    state: Mutex<FactoryState>,
}

impl EventSourceConfigFactory {
    /// 以初始配置建立工厂。
    pub fn new(config: EventSourceConfig) -> Self {
        Self {
            state: Mutex::new(FactoryState {
                config,
                created: false,
            }),
        }
    }
}

impl Configurable for EventSourceConfigFactory {
    fn get_option(&self, key: &OptionKey) -> Result<OptionValue> {
        let state = lock(&self.state);
        if *key == OPT_READ_EVENT_THREADS {
            Ok(OptionValue::U64(state.config.read_event_threads as u64))
        } else if *key == OPT_WRITE_EVENT_THREADS {
            Ok(OptionValue::U64(state.config.write_event_threads as u64))
        } else {
            Err(unsupported_option(key))
        }
    }

    fn set_option(&self, key: &OptionKey, value: OptionValue) -> Result<()> {
        let mut state = lock(&self.state);
        if state.created {
            return Err(ChannelError::InvalidState {
                reason: "configuration is frozen after create",
            });
        }
        let count = match value {
            OptionValue::U64(count) if count > 0 => count as usize,
            OptionValue::U64(_) => {
                return Err(ChannelError::InvalidState {
                    reason: "event thread count must be positive",
                });
            }
            _ => {
                return Err(ChannelError::InvalidState {
                    reason: "event thread count expects an unsigned integer",
                });
            }
        };
        if *key == OPT_READ_EVENT_THREADS {
            state.config.read_event_threads = count;
            Ok(())
        } else if *key == OPT_WRITE_EVENT_THREADS {
            state.config.write_event_threads = count;
            Ok(())
        } else {
            Err(unsupported_option(key))
        }
    }

    fn options(&self) -> &[OptionKey] {
        &FACTORY_OPTIONS
    }
}

impl ConfigurableFactory<EventSourceConfig> for EventSourceConfigFactory {
    fn create(&self) -> Result<EventSourceConfig> {
        let mut state = lock(&self.state);
        if state.created {
            return Err(ChannelError::InvalidState {
                reason: "configuration factory already consumed",
            });
        }
        state.created = true;
        Ok(state.config.clone())
    }
}
