//! Backend registration and opening
//!
//! A backend string is `name` or `name:key1=value1,key2=value2`:
//!
//! - `sim` - in-memory simulator, discarded on exit
//! - `sim:image=flash.bin` - simulator backed by an image file, created if
//!   missing and written back when the command changed the memory
//! - `linux_gpio:dev=/dev/gpiochip0,cs=8,sck=11,io0=10,io1=9,io2=24,io3=25`

use std::path::PathBuf;

use c3flash_core::flash::SerialFlash;
use c3flash_sim::{ImageError, SimConfig, SimFlash};
use thiserror::Error;

/// Backend opening errors
#[derive(Debug, Error)]
pub enum BackendError {
    /// Malformed option list
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    InvalidParameter(String),

    /// Unsupported or disabled backend
    #[error("Unknown backend '{0}' [available: {available}]", available = backend_names())]
    UnknownBackend(String),

    /// Option the backend does not understand
    #[error("Unknown option '{key}' for backend '{backend}'")]
    UnknownOption { backend: &'static str, key: String },

    /// Simulator image could not be loaded or saved
    #[error(transparent)]
    Image(#[from] ImageError),

    /// GPIO transport could not be opened
    #[cfg(feature = "linux-gpio")]
    #[error(transparent)]
    LinuxGpio(#[from] c3flash_linux_gpio::LinuxGpioError),

    /// The engine failed to start
    #[error("Flash initialisation failed: {0}")]
    Flash(#[from] c3flash_core::Error),
}

/// Parsed backend parameters
#[derive(Debug, PartialEq, Eq)]
pub struct BackendParams {
    /// Backend name
    pub name: String,
    /// Key-value parameters in command line order
    pub params: Vec<(String, String)>,
}

impl BackendParams {
    fn as_pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a backend string into name and parameters
pub fn parse_backend_params(s: &str) -> Result<BackendParams, BackendError> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = Vec::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            let (key, value) = opt
                .split_once('=')
                .ok_or_else(|| BackendError::InvalidParameter(opt.to_string()))?;
            params.push((key.to_string(), value.to_string()));
        }
    }

    Ok(BackendParams {
        name: name.to_string(),
        params,
    })
}

/// Names of the backends compiled in
pub fn backend_names() -> String {
    let mut names = vec!["sim"];
    if cfg!(feature = "linux-gpio") {
        names.push("linux_gpio");
    }
    names.join(", ")
}

/// An opened and started flash engine
pub enum Backend {
    /// Simulated chip
    Sim {
        /// Engine over the simulator
        flash: SerialFlash<SimFlash>,
        /// Image to write back on exit
        image: Option<PathBuf>,
    },
    /// Real chip on Linux GPIO lines
    #[cfg(feature = "linux-gpio")]
    LinuxGpio(SerialFlash<c3flash_linux_gpio::LinuxGpioTransport>),
}

impl Backend {
    /// Open the backend named in `spec` and call `begin` on its engine
    pub fn open(spec: &str) -> Result<Self, BackendError> {
        let params = parse_backend_params(spec)?;
        log::debug!("backend: {} {:?}", params.name, params.params);

        match params.name.as_str() {
            "sim" => {
                let image = sim_image_param(&params)?;
                let sim = match &image {
                    Some(path) if path.exists() => {
                        log::info!("Loading flash image {}", path.display());
                        SimFlash::load_image(SimConfig::default(), path)?
                    }
                    Some(path) => {
                        log::info!("Image {} not found, starting erased", path.display());
                        SimFlash::new_default()
                    }
                    None => SimFlash::new_default(),
                };
                let mut flash = SerialFlash::new(sim);
                flash.begin()?;
                Ok(Self::Sim { flash, image })
            }
            #[cfg(feature = "linux-gpio")]
            "linux_gpio" | "linux-gpio" => {
                let transport = c3flash_linux_gpio::open_linux_gpio(&params.as_pairs())?;
                let mut flash = SerialFlash::new(transport);
                flash.begin()?;
                Ok(Self::LinuxGpio(flash))
            }
            other => Err(BackendError::UnknownBackend(other.to_string())),
        }
    }

    /// Release the backend, saving the simulator image if memory changed
    pub fn finish(self) -> Result<(), BackendError> {
        match self {
            Self::Sim {
                flash,
                image: Some(path),
            } => {
                let sim = flash.into_inner();
                let stats = sim.stats();
                if stats.programs + stats.erases > 0 {
                    sim.save_image(&path)?;
                    log::info!("Saved flash image {}", path.display());
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn sim_image_param(params: &BackendParams) -> Result<Option<PathBuf>, BackendError> {
    let mut image = None;
    for (key, value) in params.as_pairs() {
        match key {
            "image" => image = Some(PathBuf::from(value)),
            _ => {
                return Err(BackendError::UnknownOption {
                    backend: "sim",
                    key: key.to_string(),
                })
            }
        }
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let params = parse_backend_params("sim").unwrap();
        assert_eq!(params.name, "sim");
        assert!(params.params.is_empty());
    }

    #[test]
    fn test_parse_keeps_option_order() {
        let params = parse_backend_params("linux_gpio:dev=/dev/gpiochip0,cs=8,sck=11").unwrap();
        assert_eq!(params.name, "linux_gpio");
        assert_eq!(
            params.as_pairs(),
            [("dev", "/dev/gpiochip0"), ("cs", "8"), ("sck", "11")]
        );
    }

    #[test]
    fn test_parse_rejects_missing_value() {
        assert!(matches!(
            parse_backend_params("sim:image"),
            Err(BackendError::InvalidParameter(opt)) if opt == "image"
        ));
    }

    #[test]
    fn test_unknown_backend_and_option() {
        assert!(matches!(
            Backend::open("ch341a"),
            Err(BackendError::UnknownBackend(name)) if name == "ch341a"
        ));
        assert!(matches!(
            Backend::open("sim:size=2M"),
            Err(BackendError::UnknownOption { backend: "sim", .. })
        ));
    }

    #[test]
    fn test_sim_image_written_only_when_modified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flash.bin");
        let spec = format!("sim:image={}", path.display());

        Backend::open(&spec).unwrap().finish().unwrap();
        assert!(!path.exists());

        let mut backend = Backend::open(&spec).unwrap();
        if let Backend::Sim { flash, .. } = &mut backend {
            flash.erase_prefs_block(0).unwrap();
        }
        backend.finish().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 1024 * 1024);
    }
}
