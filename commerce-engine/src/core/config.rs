use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

/// 引擎配置 - 价格、运费、重试、超时等所有可调项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/commerce | 工作目录 (数据库、日志) |
/// | BUSINESS_TZ | UTC | 编号窗口使用的业务时区 |
/// | TAX_RATE | 0 | 税率，作用于 (小计 − 折扣) |
/// | SHIPPING_FLAT | 0 | 非空购物车的固定运费 |
/// | FREE_SHIPPING_THRESHOLD | (未设置) | 小计达到该值免运费 |
/// | CART_ABANDON_AFTER_SECS | 86400 | 购物车闲置多久视为放弃 |
/// | ORACLE_TIMEOUT_MS | 2000 | 同步时单行查询超时(毫秒) |
/// | RETRY_ATTEMPTS | 3 | 重复键冲突重试次数 |
/// | RETRY_BASE_DELAY_MS | 50 | 首次退避延迟，每次翻倍 |
/// | PRICE_EPSILON | 0.01 | 价格漂移容差 |
/// | LOG_LEVEL | info | 默认日志级别 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/commerce TAX_RATE=0.21 BUSINESS_TZ=Europe/Madrid cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// 业务时区 (订单号按该时区的日期切窗口)
    pub business_tz: Tz,
    pub tax_rate: Decimal,
    pub shipping_flat: Decimal,
    pub free_shipping_threshold: Option<Decimal>,
    pub cart_abandon_after_secs: u64,
    pub oracle_timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub price_epsilon: Decimal,
    pub log_level: String,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/commerce".into()),
            business_tz: env_parse("BUSINESS_TZ").unwrap_or(Tz::UTC),
            tax_rate: env_parse("TAX_RATE").unwrap_or(Decimal::ZERO),
            shipping_flat: env_parse("SHIPPING_FLAT").unwrap_or(Decimal::ZERO),
            free_shipping_threshold: env_parse("FREE_SHIPPING_THRESHOLD"),
            cart_abandon_after_secs: env_parse("CART_ABANDON_AFTER_SECS").unwrap_or(86_400),
            oracle_timeout_ms: env_parse("ORACLE_TIMEOUT_MS").unwrap_or(2_000),
            retry_attempts: env_parse("RETRY_ATTEMPTS").unwrap_or(3),
            retry_base_delay_ms: env_parse("RETRY_BASE_DELAY_MS").unwrap_or(50),
            price_epsilon: env_parse("PRICE_EPSILON").unwrap_or(Decimal::new(1, 2)),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
        }
    }

    /// 与环境无关的默认配置
    ///
    /// 常用于测试场景
    pub fn baseline() -> Self {
        Self {
            work_dir: "/var/lib/commerce".into(),
            business_tz: Tz::UTC,
            tax_rate: Decimal::ZERO,
            shipping_flat: Decimal::ZERO,
            free_shipping_threshold: None,
            cart_abandon_after_secs: 86_400,
            oracle_timeout_ms: 2_000,
            retry_attempts: 3,
            retry_base_delay_ms: 50,
            price_epsilon: Decimal::new(1, 2),
            log_level: "info".into(),
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<String>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_business_tz(mut self, tz: Tz) -> Self {
        self.business_tz = tz;
        self
    }

    pub fn with_tax_rate(mut self, rate: Decimal) -> Self {
        self.tax_rate = rate;
        self
    }

    pub fn with_shipping(mut self, flat: Decimal, free_threshold: Option<Decimal>) -> Self {
        self.shipping_flat = flat;
        self.free_shipping_threshold = free_threshold;
        self
    }

    pub fn with_oracle_timeout_ms(mut self, ms: u64) -> Self {
        self.oracle_timeout_ms = ms;
        self
    }

    pub fn with_retry(mut self, attempts: u32, base_delay_ms: u64) -> Self {
        self.retry_attempts = attempts;
        self.retry_base_delay_ms = base_delay_ms;
        self
    }

    pub fn with_cart_abandon_after_secs(mut self, secs: u64) -> Self {
        self.cart_abandon_after_secs = secs;
        self
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("commerce.redb")
    }

    /// 日志目录
    pub fn log_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("logs")
    }

    /// 确保工作目录结构存在 (work_dir, logs)
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        std::fs::create_dir_all(self.log_dir())
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    /// 放弃窗口 (毫秒)
    pub fn cart_abandon_window_ms(&self) -> i64 {
        i64::try_from(self.cart_abandon_after_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_defaults() {
        let config = Config::baseline();
        assert_eq!(config.business_tz, Tz::UTC);
        assert_eq!(config.price_epsilon, Decimal::new(1, 2));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.cart_abandon_window_ms(), 86_400_000);
    }

    #[test]
    fn test_builder_overrides() {
        let config = Config::baseline()
            .with_work_dir("/tmp/commerce")
            .with_tax_rate(Decimal::new(21, 2))
            .with_shipping(Decimal::from(5), Some(Decimal::from(50)))
            .with_business_tz(chrono_tz::Europe::Madrid);
        assert_eq!(config.tax_rate, Decimal::new(21, 2));
        assert_eq!(config.free_shipping_threshold, Some(Decimal::from(50)));
        assert_eq!(
            config.database_path(),
            std::path::PathBuf::from("/tmp/commerce/commerce.redb")
        );
        assert_eq!(config.business_tz, chrono_tz::Europe::Madrid);
    }

    #[test]
    fn test_tz_parses_from_name() {
        let tz: Tz = "Asia/Shanghai".parse().unwrap();
        assert_eq!(tz, chrono_tz::Asia::Shanghai);
    }
}
