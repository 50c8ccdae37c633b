//! Configuration loading and validation (TOML). A relative `db` path
//! is resolved against the config file's own directory, not the
//! process's working directory, so where the collector is launched
//! from never changes which database it opens.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Raw, loosely-typed shape of the TOML file. Optional fields let one
/// file satisfy either transport section without the other being
/// present.
#[derive(Debug, Deserialize)]
struct RawConfig {
    db: Option<String>,
    transport: Option<String>,
    rs485: Option<RawRs485>,
    udp: Option<RawUdp>,
}

#[derive(Debug, Deserialize)]
struct RawRs485 {
    port: Option<String>,
    baudrate: Option<i64>,
    interval: Option<i64>,
    devices: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
struct RawUdp {
    port: Option<i64>,
}

/// Validated configuration, ready to hand to the Supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Config {
    Rs485 {
        db: String,
        port: String,
        baudrate: u32,
        interval_secs: u64,
        devices: Vec<u8>,
    },
    Udp {
        db: String,
        port: u16,
    },
}

impl Config {
    /// Loads and validates a config file. `cli_transport`, if given,
    /// must agree with the file's `transport` key (or substitute for
    /// it if the key is absent), mirroring the CLI's `--transport`
    /// override.
    pub async fn load(path: &Path, cli_transport: Option<&str>) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path).await?;
        let raw: RawConfig = toml::from_str(&text)?;

        let transport = resolve_transport(raw.transport.as_deref(), cli_transport)?;

        let db = raw.db.ok_or(ConfigError::MissingKey("db"))?;
        let db = resolve_db_path(path, &db);

        match transport.as_str() {
            "rs485" => {
                let section = raw.rs485.ok_or(ConfigError::MissingKey("rs485"))?;
                let devices = section.devices.ok_or(ConfigError::MissingKey("rs485.devices"))?;
                if devices.is_empty() {
                    return Err(ConfigError::EmptyDevices);
                }
                let mut checked = Vec::with_capacity(devices.len());
                for d in devices {
                    if !(1..=247).contains(&d) {
                        return Err(ConfigError::DeviceOutOfRange(d));
                    }
                    checked.push(d as u8);
                }

                let port = section.port.ok_or(ConfigError::MissingKey("rs485.port"))?;
                let baudrate = section
                    .baudrate
                    .ok_or(ConfigError::MissingKey("rs485.baudrate"))?;
                let interval = section
                    .interval
                    .ok_or(ConfigError::MissingKey("rs485.interval"))?;
                if interval < 0 {
                    return Err(ConfigError::WrongType {
                        key: "rs485.interval",
                        expected: "a non-negative integer",
                    });
                }

                Ok(Config::Rs485 {
                    db,
                    port,
                    baudrate: baudrate as u32,
                    interval_secs: interval as u64,
                    devices: checked,
                })
            }
            "udp" => {
                let section = raw.udp.ok_or(ConfigError::MissingKey("udp"))?;
                let port = section.port.ok_or(ConfigError::MissingKey("udp.port"))?;
                let port = u16::try_from(port).map_err(|_| ConfigError::WrongType {
                    key: "udp.port",
                    expected: "an integer 0-65535",
                })?;
                Ok(Config::Udp { db, port })
            }
            other => Err(ConfigError::BadTransport(other.to_string())),
        }
    }

    pub fn db_path(&self) -> &str {
        match self {
            Config::Rs485 { db, .. } => db,
            Config::Udp { db, .. } => db,
        }
    }
}

fn resolve_transport(
    file_transport: Option<&str>,
    cli_transport: Option<&str>,
) -> Result<String, ConfigError> {
    let resolved = match (file_transport, cli_transport) {
        (Some(f), Some(c)) if f != c => {
            return Err(ConfigError::TransportMismatch {
                cli: c.to_string(),
                config: f.to_string(),
            })
        }
        (Some(f), _) => f.to_string(),
        (None, Some(c)) => c.to_string(),
        (None, None) => return Err(ConfigError::MissingKey("transport")),
    };

    if resolved != "rs485" && resolved != "udp" {
        return Err(ConfigError::BadTransport(resolved));
    }
    Ok(resolved)
}

/// Resolves a relative `db` path against the config file's parent
/// directory, so invocation cwd doesn't change collector behavior.
fn resolve_db_path(config_path: &Path, db: &str) -> String {
    let db_path = Path::new(db);
    if db_path.is_absolute() || db == ":memory:" {
        return db.to_string();
    }
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    let resolved: PathBuf = base.join(db_path);
    resolved.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[tokio::test]
    async fn loads_rs485_config() {
        let f = write_temp(
            r#"
            db = "tmon.db"
            transport = "rs485"

            [rs485]
            port = "/dev/ttyUSB0"
            baudrate = 9600
            interval = 30
            devices = [1, 2, 3]
            "#,
        );
        let cfg = Config::load(f.path(), None).await.unwrap();
        match cfg {
            Config::Rs485 {
                port,
                baudrate,
                interval_secs,
                devices,
                ..
            } => {
                assert_eq!(port, "/dev/ttyUSB0");
                assert_eq!(baudrate, 9600);
                assert_eq!(interval_secs, 30);
                assert_eq!(devices, vec![1, 2, 3]);
            }
            Config::Udp { .. } => panic!("expected rs485"),
        }
    }

    #[tokio::test]
    async fn loads_udp_config() {
        let f = write_temp(
            r#"
            db = "tmon.db"
            transport = "udp"

            [udp]
            port = 5555
            "#,
        );
        let cfg = Config::load(f.path(), None).await.unwrap();
        match cfg {
            Config::Udp { port, .. } => assert_eq!(port, 5555),
            Config::Rs485 { .. } => panic!("expected udp"),
        }
    }

    #[tokio::test]
    async fn rejects_empty_devices() {
        let f = write_temp(
            r#"
            db = "tmon.db"
            transport = "rs485"

            [rs485]
            port = "/dev/ttyUSB0"
            baudrate = 9600
            interval = 30
            devices = []
            "#,
        );
        assert!(matches!(
            Config::load(f.path(), None).await,
            Err(ConfigError::EmptyDevices)
        ));
    }

    #[tokio::test]
    async fn rejects_device_out_of_range() {
        let f = write_temp(
            r#"
            db = "tmon.db"
            transport = "rs485"

            [rs485]
            port = "/dev/ttyUSB0"
            baudrate = 9600
            interval = 30
            devices = [0, 300]
            "#,
        );
        assert!(matches!(
            Config::load(f.path(), None).await,
            Err(ConfigError::DeviceOutOfRange(_))
        ));
    }

    #[tokio::test]
    async fn cli_transport_override_conflict() {
        let f = write_temp(
            r#"
            db = "tmon.db"
            transport = "rs485"

            [rs485]
            port = "/dev/ttyUSB0"
            baudrate = 9600
            interval = 30
            devices = [1]
            "#,
        );
        assert!(matches!(
            Config::load(f.path(), Some("udp")).await,
            Err(ConfigError::TransportMismatch { .. })
        ));
    }

    #[test]
    fn resolves_relative_db_path_against_config_dir() {
        let config_path = Path::new("/etc/tmon/collector.toml");
        let resolved = resolve_db_path(config_path, "data/tmon.db");
        assert_eq!(resolved, "/etc/tmon/data/tmon.db");
    }

    #[test]
    fn absolute_db_path_is_unchanged() {
        let config_path = Path::new("/etc/tmon/collector.toml");
        let resolved = resolve_db_path(config_path, "/var/lib/tmon.db");
        assert_eq!(resolved, "/var/lib/tmon.db");
    }
}
