// ── Wire-to-domain conversion ──
//
// Maps `fritzha_api` XML models onto `Device`. Product names are matched
// exactly; the router reports telemetry in milli-units and tenths of a
// degree, which are scaled here.

use chrono::{DateTime, Utc};
use tracing::warn;

use fritzha_api::DeviceEntry;

use crate::model::{Device, DeviceType};

/// Exact product name → device type.
pub fn device_type_for_product(product: &str) -> DeviceType {
    match product {
        "FRITZ!DECT 200" | "FRITZ!DECT 210" => DeviceType::Switch,
        "FRITZ!DECT Repeater 100" => DeviceType::Repeater,
        _ => DeviceType::Unknown,
    }
}

/// Build an inventory record from a `<device>` entry.
pub fn device_from_entry(entry: &DeviceEntry) -> Device {
    let device_type = device_type_for_product(&entry.product_name);
    let mut device = Device::new(entry.ain(), device_type);
    device.product_name.clone_from(&entry.product_name);
    device.name = entry.name().map(str::to_owned);
    device.present = entry.present().map(str::to_owned);

    match device_type {
        DeviceType::Switch => {
            device.capabilities.has_state = true;
            device.state = switch_state(entry);
        }
        DeviceType::Repeater => device.capabilities.has_temperature = true,
        DeviceType::Lamp | DeviceType::Unknown => {}
    }

    // Independent of the product: what the entry actually carries.
    if entry.powermeter.is_some() {
        device.capabilities.has_power = true;
    }
    if entry.temperature.is_some() {
        device.capabilities.has_temperature = true;
    }

    device
}

/// Copy this cycle's readings from `entry` onto `device`.
///
/// A field is only overwritten when the router reported it; the rest keep
/// the value from an earlier cycle.
pub fn apply_readings(device: &mut Device, entry: &DeviceEntry, at: DateTime<Utc>) {
    if let Some(pm) = &entry.powermeter {
        if let Some(v) = scaled(&device.ain, "voltage", pm.voltage(), 1000.0) {
            device.measurements.voltage = Some(v);
        }
        if let Some(v) = scaled(&device.ain, "power", pm.power(), 1000.0) {
            device.measurements.power = Some(v);
        }
        // Reported in Wh but scaled like power; stored series use this scale.
        if let Some(v) = scaled(&device.ain, "energy", pm.energy(), 1000.0) {
            device.measurements.energy = Some(v);
        }
    }
    if let Some(temp) = &entry.temperature {
        if let Some(v) = scaled(&device.ain, "temperature", temp.celsius(), 10.0) {
            device.measurements.temperature = Some(v);
        }
    }

    if let Some(present) = entry.present() {
        device.present = Some(present.to_owned());
    }
    if device.capabilities.has_state {
        if let Some(state) = switch_state(entry) {
            device.state = Some(state);
        }
    }

    device.measured_at = Some(at);
    device.up_to_date = true;
}

fn switch_state(entry: &DeviceEntry) -> Option<String> {
    entry
        .switch
        .as_ref()
        .and_then(|s| s.state())
        .map(str::to_owned)
}

fn scaled(ain: &str, field: &str, raw: Option<&str>, divisor: f64) -> Option<f64> {
    let raw = raw?;
    match raw.parse::<i64>() {
        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        Ok(value) => Some(value as f64 / divisor),
        Err(_) => {
            warn!(ain, field, raw, "ignoring non-numeric reading");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fritzha_api::models::from_xml;
    use fritzha_api::DeviceList;
    use pretty_assertions::assert_eq;

    use super::*;

    fn entry(xml: &str) -> DeviceEntry {
        let list: DeviceList = from_xml(&format!("<devicelist>{xml}</devicelist>")).unwrap();
        list.devices.into_iter().next().unwrap()
    }

    #[test]
    fn product_name_mapping_is_exact() {
        assert_eq!(device_type_for_product("FRITZ!DECT 200"), DeviceType::Switch);
        assert_eq!(device_type_for_product("FRITZ!DECT 210"), DeviceType::Switch);
        assert_eq!(
            device_type_for_product("FRITZ!DECT Repeater 100"),
            DeviceType::Repeater
        );
        assert_eq!(device_type_for_product("FRITZ!DECT 301"), DeviceType::Unknown);
        assert_eq!(device_type_for_product("fritz!dect 200"), DeviceType::Unknown);
    }

    #[test]
    fn switch_entry_gets_state() {
        let d = device_from_entry(&entry(
            r#"<device identifier="08761 0000434" productname="FRITZ!DECT 200">
                 <present>1</present><name>Plug</name>
                 <switch><state>0</state></switch>
                 <powermeter><voltage>230000</voltage></powermeter>
               </device>"#,
        ));
        assert_eq!(d.ain, "087610000434");
        assert_eq!(d.device_type, DeviceType::Switch);
        assert_eq!(d.state.as_deref(), Some("0"));
        assert_eq!(d.name.as_deref(), Some("Plug"));
        assert_eq!(d.present.as_deref(), Some("1"));
        assert_eq!(
            d.capabilities,
            crate::model::Capabilities {
                has_state: true,
                has_power: true,
                has_temperature: false,
            }
        );
    }

    #[test]
    fn repeater_with_temperature_block_is_idempotent() {
        let d = device_from_entry(&entry(
            r#"<device identifier="11657 0272633" productname="FRITZ!DECT Repeater 100">
                 <temperature><celsius>200</celsius></temperature>
               </device>"#,
        ));
        assert_eq!(d.device_type, DeviceType::Repeater);
        assert!(d.capabilities.has_temperature);
        assert!(!d.capabilities.has_state);
        assert!(d.state.is_none());
    }

    #[test]
    fn unknown_product_still_reports_blocks() {
        let d = device_from_entry(&entry(
            r#"<device identifier="09995 0123456" productname="FRITZ!DECT 301">
                 <temperature><celsius>195</celsius></temperature>
               </device>"#,
        ));
        assert_eq!(d.device_type, DeviceType::Unknown);
        assert!(d.capabilities.has_temperature);
        assert!(!d.capabilities.has_power);
    }

    #[test]
    fn readings_are_scaled() {
        let e = entry(
            r#"<device identifier="08761 0000434" productname="FRITZ!DECT 200">
                 <switch><state>1</state></switch>
                 <powermeter><voltage>230000</voltage><power>4820</power><energy>707</energy></powermeter>
                 <temperature><celsius>215</celsius></temperature>
               </device>"#,
        );
        let mut d = device_from_entry(&e);
        let at = Utc::now();
        apply_readings(&mut d, &e, at);

        assert_eq!(d.measurements.voltage, Some(230.0));
        assert_eq!(d.measurements.power, Some(4.82));
        assert_eq!(d.measurements.energy, Some(0.707));
        assert_eq!(d.measurements.temperature, Some(21.5));
        assert_eq!(d.measured_at, Some(at));
        assert!(d.up_to_date);
    }

    #[test]
    fn missing_fields_keep_previous_values() {
        let full = entry(
            r#"<device identifier="1" productname="FRITZ!DECT 200">
                 <powermeter><voltage>230000</voltage><power>1000</power><energy>5</energy></powermeter>
               </device>"#,
        );
        let partial = entry(
            r#"<device identifier="1" productname="FRITZ!DECT 200">
                 <powermeter><voltage></voltage><power>2000</power><energy>x</energy></powermeter>
               </device>"#,
        );
        let mut d = device_from_entry(&full);
        apply_readings(&mut d, &full, Utc::now());
        apply_readings(&mut d, &partial, Utc::now());

        assert_eq!(d.measurements.voltage, Some(230.0));
        assert_eq!(d.measurements.power, Some(2.0));
        assert_eq!(d.measurements.energy, Some(0.005));
    }
}
