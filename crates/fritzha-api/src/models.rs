// AHA response types
//
// XML models for `login_sid.lua` and `homeautoswitch.lua?switchcmd=
// getdevicelistinfos`. Numeric telemetry is kept as raw text here; unit
// scaling and parsing happen in `fritzha-core` where the domain lives.
// Every child element is optional because the router omits whole blocks
// depending on the device's function bitmask and firmware.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::Error;

// ── Session info ─────────────────────────────────────────────────────

/// Body of every `login_sid.lua` response.
///
/// ```xml
/// <SessionInfo>
///   <SID>0000000000000000</SID>
///   <Challenge>1234567z</Challenge>
///   <BlockTime>0</BlockTime>
///   <Rights/>
/// </SessionInfo>
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    #[serde(rename = "SID")]
    pub sid: String,
    #[serde(rename = "Challenge", default)]
    pub challenge: Option<String>,
    /// Seconds the router refuses further login attempts.
    #[serde(rename = "BlockTime", default)]
    pub block_time: Option<String>,
}

impl SessionInfo {
    /// The challenge, if the router sent a non-empty one.
    pub fn challenge(&self) -> Option<&str> {
        non_empty(self.challenge.as_deref())
    }

    pub fn block_time_secs(&self) -> Option<u32> {
        non_empty(self.block_time.as_deref()).and_then(|s| s.parse().ok())
    }
}

// ── Device list ──────────────────────────────────────────────────────

/// `<devicelist>` root. `<group>` siblings are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceList {
    #[serde(rename = "device", default)]
    pub devices: Vec<DeviceEntry>,
}

/// One `<device>` element.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    /// AIN as printed on the device, e.g. `"08761 0000434"`.
    #[serde(rename = "@identifier")]
    pub identifier: String,
    #[serde(rename = "@productname", default)]
    pub product_name: String,
    #[serde(rename = "@fwversion", default)]
    pub fw_version: Option<String>,
    #[serde(default)]
    pub present: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub switch: Option<SwitchInfo>,
    #[serde(default)]
    pub powermeter: Option<PowerMeter>,
    #[serde(default)]
    pub temperature: Option<TemperatureInfo>,
}

impl DeviceEntry {
    /// The AIN with all whitespace removed, the form used as inventory key.
    pub fn ain(&self) -> String {
        self.identifier.chars().filter(|c| !c.is_whitespace()).collect()
    }

    pub fn name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }

    pub fn present(&self) -> Option<&str> {
        non_empty(self.present.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwitchInfo {
    /// `0`/`1`, empty while the device is offline.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl SwitchInfo {
    pub fn state(&self) -> Option<&str> {
        non_empty(self.state.as_deref())
    }
}

/// Raw `<powermeter>` readings: millivolts, milliwatts, watt hours.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PowerMeter {
    #[serde(default)]
    pub voltage: Option<String>,
    #[serde(default)]
    pub power: Option<String>,
    #[serde(default)]
    pub energy: Option<String>,
}

impl PowerMeter {
    pub fn voltage(&self) -> Option<&str> {
        non_empty(self.voltage.as_deref())
    }

    pub fn power(&self) -> Option<&str> {
        non_empty(self.power.as_deref())
    }

    pub fn energy(&self) -> Option<&str> {
        non_empty(self.energy.as_deref())
    }
}

/// Raw `<temperature>` readings in tenths of a degree Celsius.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemperatureInfo {
    #[serde(default)]
    pub celsius: Option<String>,
    #[serde(default)]
    pub offset: Option<String>,
}

impl TemperatureInfo {
    pub fn celsius(&self) -> Option<&str> {
        non_empty(self.celsius.as_deref())
    }
}

// ── Parsing ──────────────────────────────────────────────────────────

/// Deserialize an XML body, keeping a preview of the body on failure.
pub fn from_xml<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    quick_xml::de::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Xml {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
