//! Configuration for organs, pools and dispatch.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration. Durations are expressed in cell clocks: one clock is
//! `timing.cell_clock_ms` milliseconds.

use crate::blob::{HormoneBlob, LigandBlob, ResourceBlob, WasteBlob};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

/// Top-level Efflux configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffluxConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Length of one cell clock in milliseconds.
    #[serde(default = "default_cell_clock_ms")]
    pub cell_clock_ms: u64,
    /// Default deadline of `request_work`, in clocks.
    #[serde(default = "default_request_timeout_clocks")]
    pub request_timeout_clocks: u32,
    /// How long an incoming request waits for an idle local worker, in clocks.
    #[serde(default = "default_wait_for_worker_clocks")]
    pub wait_for_worker_clocks: u32,
    /// Interval between two diffusion rounds, in clocks.
    #[serde(default = "default_diffusion_clocks")]
    pub diffusion_clocks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Capacity of each split pool's command queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_seed_o2")]
    pub seed_o2: u64,
    #[serde(default = "default_seed_glucose")]
    pub seed_glucose: u64,
    #[serde(default = "default_seed_vitamins")]
    pub seed_vitamins: u64,
    #[serde(default = "default_seed_growth")]
    pub seed_growth: u64,
    #[serde(default)]
    pub seed_granulocyte_csf: u64,
    #[serde(default)]
    pub seed_macrophage_csf: u64,
    #[serde(default)]
    pub seed_interleukin_3: u64,
    #[serde(default)]
    pub seed_interleukin_2: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Capacity of each manager's result buffer.
    #[serde(default = "default_result_buffer_size")]
    pub result_buffer_size: usize,
    /// Interface organs bind their listeners to. The port is always
    /// chosen by the operating system.
    #[serde(default = "default_bind_host")]
    pub bind_host: IpAddr,
}

fn default_cell_clock_ms() -> u64 { 50 }
fn default_request_timeout_clocks() -> u32 { 10 }
fn default_wait_for_worker_clocks() -> u32 { 100 }
fn default_diffusion_clocks() -> u32 { 1 }
fn default_queue_capacity() -> usize { 100 }
fn default_seed_o2() -> u64 { 10000 }
fn default_seed_glucose() -> u64 { 10000 }
fn default_seed_vitamins() -> u64 { 10000 }
fn default_seed_growth() -> u64 { 100 }
fn default_result_buffer_size() -> usize { 10 }
fn default_bind_host() -> IpAddr { IpAddr::V4(Ipv4Addr::LOCALHOST) }

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cell_clock_ms: default_cell_clock_ms(),
            request_timeout_clocks: default_request_timeout_clocks(),
            wait_for_worker_clocks: default_wait_for_worker_clocks(),
            diffusion_clocks: default_diffusion_clocks(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            seed_o2: default_seed_o2(),
            seed_glucose: default_seed_glucose(),
            seed_vitamins: default_seed_vitamins(),
            seed_growth: default_seed_growth(),
            seed_granulocyte_csf: 0,
            seed_macrophage_csf: 0,
            seed_interleukin_3: 0,
            seed_interleukin_2: 0,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            result_buffer_size: default_result_buffer_size(),
            bind_host: default_bind_host(),
        }
    }
}

impl TimingConfig {
    pub fn cell_clock(&self) -> Duration {
        Duration::from_millis(self.cell_clock_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        self.cell_clock() * self.request_timeout_clocks
    }

    pub fn wait_for_worker(&self) -> Duration {
        self.cell_clock() * self.wait_for_worker_clocks
    }

    pub fn diffusion_interval(&self) -> Duration {
        self.cell_clock() * self.diffusion_clocks
    }
}

impl PoolConfig {
    pub fn seed_resources(&self) -> ResourceBlob {
        ResourceBlob {
            o2: self.seed_o2,
            glucose: self.seed_glucose,
            vitamins: self.seed_vitamins,
        }
    }

    /// Organs start without waste.
    pub fn seed_waste(&self) -> WasteBlob {
        WasteBlob::default()
    }

    pub fn seed_ligands(&self) -> LigandBlob {
        LigandBlob {
            growth: self.seed_growth,
            ..Default::default()
        }
    }

    pub fn seed_hormones(&self) -> HormoneBlob {
        HormoneBlob {
            granulocyte_csf: self.seed_granulocyte_csf,
            macrophage_csf: self.seed_macrophage_csf,
            interleukin_3: self.seed_interleukin_3,
            interleukin_2: self.seed_interleukin_2,
        }
    }
}

impl EffluxConfig {
    /// Parse a configuration from a TOML document and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EffluxConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] when the file cannot be read,
    /// [`CoreError::Parse`] when it is not valid TOML, and
    /// [`CoreError::InvalidConfig`] when a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Serialize the configuration as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that would stall every organ.
    pub fn validate(&self) -> Result<()> {
        let checks: [(&'static str, bool); 6] = [
            ("timing.cell_clock_ms", self.timing.cell_clock_ms == 0),
            ("timing.request_timeout_clocks", self.timing.request_timeout_clocks == 0),
            ("timing.wait_for_worker_clocks", self.timing.wait_for_worker_clocks == 0),
            ("timing.diffusion_clocks", self.timing.diffusion_clocks == 0),
            ("pool.queue_capacity", self.pool.queue_capacity == 0),
            ("dispatch.result_buffer_size", self.dispatch.result_buffer_size == 0),
        ];
        for (field, is_zero) in checks {
            if is_zero {
                return Err(CoreError::InvalidConfig {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}
