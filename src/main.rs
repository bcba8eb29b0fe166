use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use nvs_kv::cli::Config;
use nvs_kv::{Error, FjallNvs, Memory, NvsBackend, Result, Value, ValueType};

#[derive(Parser)]
#[command(name = "nvs-kv")]
#[command(about = "Typed get/set over a persistent NVS namespace")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store path, overrides the configuration file
    #[arg(long, global = true, env = "NVS_KV_PATH")]
    path: Option<PathBuf>,

    /// Namespace to open, overrides the configuration file
    #[arg(long, global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the store and open the namespace, recovering if needed
    Init,

    /// Read a value
    Get {
        /// Type of the stored value
        #[arg(short = 't', long = "type", value_enum)]
        value_type: ValueType,

        /// Key to read
        key: String,
    },

    /// Write a value and commit it
    Set {
        /// Type of the value
        #[arg(short = 't', long = "type", value_enum)]
        value_type: ValueType,

        /// Key to write
        key: String,

        /// Value to write (decimal for int)
        value: String,
    },

    /// Erase every namespace in the store
    Erase,

    /// Write and read back a sample integer and string
    Demo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(path) = cli.path {
        config.store.path = path;
    }
    if let Some(namespace) = cli.namespace {
        config.store.namespace = namespace;
    }

    nvs_kv::cli::init_logging(&config.logging)?;

    let backend = FjallNvs::new(&config.store.path);
    let mut memory = Memory::with_namespace(backend, config.store.namespace.as_str());

    match cli.command {
        Commands::Init => {
            memory.init()?;
            println!(
                "Initialized namespace '{}' at {}",
                memory.namespace(),
                config.store.path.display()
            );
        }

        Commands::Get { value_type, key } => {
            memory.init()?;
            let value = memory.get(value_type, &key)?;
            println!("{}", value);
        }

        Commands::Set {
            value_type,
            key,
            value,
        } => {
            let value = parse_value(value_type, value)?;
            memory.init()?;
            memory.set(&key, &value)?;
            println!("Set {} '{}'", value_type, key);
        }

        Commands::Erase => {
            memory.backend_mut().erase_all()?;
            println!("Erased store at {}", config.store.path.display());
        }

        Commands::Demo => {
            memory.init()?;

            memory.set_i32("counter", 1234)?;
            memory.set_str("greeting", "Hola ESP32")?;

            let counter = memory.get_i32("counter")?;
            let greeting = memory.get_str("greeting")?;
            info!(counter, greeting = %greeting, "read back demo values");
            println!("counter = {}", counter);
            println!("greeting = {}", greeting);
        }
    }

    memory.deinit()?;
    Ok(())
}

fn parse_value(value_type: ValueType, raw: String) -> Result<Value> {
    match value_type {
        ValueType::Int => raw
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|e| Error::invalid_input(format!("'{}' is not an int: {}", raw, e))),
        ValueType::String => Ok(Value::Str(raw)),
        // Rejected by the façade, which reports why
        ValueType::Blob => Ok(Value::Blob(raw.into_bytes())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_value(ValueType::Int, "1234".to_string()).unwrap(), Value::Int(1234));
        assert_eq!(parse_value(ValueType::Int, "-7".to_string()).unwrap(), Value::Int(-7));
    }

    #[test]
    fn test_parse_bad_int() {
        for raw in ["12.5", "abc", "", "2147483648"] {
            let err = parse_value(ValueType::Int, raw.to_string()).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "accepted '{}'", raw);
        }
    }

    #[test]
    fn test_parse_string_and_blob() {
        assert_eq!(
            parse_value(ValueType::String, "Hola ESP32".to_string()).unwrap(),
            Value::from("Hola ESP32")
        );
        assert_eq!(
            parse_value(ValueType::Blob, "raw".to_string()).unwrap(),
            Value::Blob(b"raw".to_vec())
        );
    }
}
