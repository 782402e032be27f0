use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub game: GameDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    /// 注册时携带此密钥可创建 ADMIN 账号
    #[serde(default)]
    pub secret: String,
}

/// 游戏参数默认值, 首次读取 game_status 时写入单行记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDefaults {
    pub time_ratio: i64,
    pub total_days: i32,
    pub initial_price: Decimal,
    pub initial_cash: Decimal,
    pub max_leverage: i32,
    pub daily_interest_rate: Decimal,
    pub max_loan_amount: Decimal,
    /// 红包数量不足时的保底奖品名称
    pub consolation_prize: String,
    /// 借款/还款是否要求游戏进行中 (两个历史版本行为不一致, 默认要求)
    pub require_started_for_loans: bool,
}

impl Default for GameDefaults {
    fn default() -> Self {
        Self {
            time_ratio: 60,
            total_days: 120,
            initial_price: Decimal::new(100, 0),
            initial_cash: Decimal::new(10_000, 0),
            max_leverage: 10,
            daily_interest_rate: Decimal::new(1, 4), // 0.0001
            max_loan_amount: Decimal::new(5_000, 0),
            consolation_prize: "阳光普照奖".to_string(),
            require_started_for_loans: true,
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件, 不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量, 且未找到配置文件 config.toml")?;

                // production 环境默认监听 0.0.0.0
                let default_host = match get_env("APP_ENV").as_deref() {
                    Some("production") => "0.0.0.0",
                    _ => "127.0.0.1",
                };

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| default_host.to_string()),
                        port: get_env_parse("PORT", 8000u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 86_400i64),
                    },
                    cors: CorsConfig {
                        origin: get_env("CORS_ORIGIN"),
                    },
                    admin: AdminConfig {
                        secret: get_env("ADMIN_SECRET").unwrap_or_default(),
                    },
                    game: GameDefaults::default(),
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖 (文件存在时同样生效)
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("CORS_ORIGIN") {
            config.cors.origin = Some(v);
        }
        if let Ok(v) = env::var("ADMIN_SECRET") {
            config.admin.secret = v;
        }

        Ok(config)
    }
}
