// ── Device inventory ──
//
// The set of devices the router knows about, in router order. Built
// wholesale from one `getdevicelistinfos` response at startup; afterwards
// each cycle only updates the entries that already exist.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use fritzha_api::{DeviceList, SessionClient};

use crate::config::DeviceConfig;
use crate::convert::{apply_readings, device_from_entry};
use crate::error::CoreError;
use crate::model::Device;

/// Outcome of matching the inventory against the configured devices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// AINs that matched a configuration entry.
    pub matched: Vec<String>,
    /// Configured AINs with no device on the router.
    pub orphaned: Vec<String>,
    /// Router devices without a configuration entry.
    pub unconfigured: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    devices: Vec<Device>,
    index: HashMap<String, usize>,
}

impl Inventory {
    /// Fetch the device list through `session` and build the inventory.
    pub async fn sync(session: &SessionClient) -> Result<Self, CoreError> {
        let list = session
            .get_device_list()
            .await?
            .ok_or_else(|| CoreError::Api {
                message: "getdevicelistinfos returned no data".into(),
            })?;
        Self::from_device_list(&list)
    }

    /// Build the inventory from a parsed device list.
    ///
    /// Fails with [`CoreError::NoDevices`] when the list is empty.
    pub fn from_device_list(list: &DeviceList) -> Result<Self, CoreError> {
        let mut inventory = Self::default();
        for entry in &list.devices {
            let device = device_from_entry(entry);
            if inventory.index.contains_key(&device.ain) {
                warn!(ain = %device.ain, "duplicate AIN in device list, keeping first");
                continue;
            }
            debug!(
                ain = %device.ain,
                device_type = %device.device_type,
                name = device.name.as_deref().unwrap_or(""),
                "found device"
            );
            inventory.index.insert(device.ain.clone(), inventory.devices.len());
            inventory.devices.push(device);
        }

        if inventory.devices.is_empty() {
            return Err(CoreError::NoDevices);
        }
        Ok(inventory)
    }

    /// Copy location and monitored kinds from the configured devices.
    ///
    /// Devices without configuration stay unmonitored; configuration
    /// without a device is reported, not rejected.
    pub fn reconcile(&mut self, configured: &[DeviceConfig]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for cfg in configured {
            let Some(device) = self.get_mut(&cfg.ain) else {
                error!(ain = %cfg.ain, "no device found for configuration");
                report.orphaned.push(cfg.ain.clone());
                continue;
            };
            device.location.clone_from(&cfg.location);
            device.sublocation.clone_from(&cfg.sublocation);
            if let Some(kinds) = &cfg.monitored {
                device.monitored.clone_from(kinds);
                device.is_monitored = true;
            }
            report.matched.push(cfg.ain.clone());
        }

        for device in &self.devices {
            if !report.matched.contains(&device.ain) {
                error!(
                    ain = %device.ain,
                    name = device.name.as_deref().unwrap_or(""),
                    "missing configuration for device"
                );
                report.unconfigured.push(device.ain.clone());
            }
        }

        report
    }

    /// Mark every device stale ahead of a new cycle.
    pub fn begin_cycle(&mut self) {
        for device in &mut self.devices {
            device.up_to_date = false;
        }
    }

    /// Apply one cycle's device list. Returns how many devices updated.
    ///
    /// Entries for AINs outside the inventory are ignored; the inventory
    /// only grows on restart.
    pub fn apply_measurements(&mut self, list: &DeviceList, at: DateTime<Utc>) -> usize {
        let mut updated = 0;
        for entry in &list.devices {
            let ain = entry.ain();
            match self.get_mut(&ain) {
                Some(device) => {
                    apply_readings(device, entry, at);
                    updated += 1;
                }
                None => debug!(ain = %ain, "device not in inventory, skipped"),
            }
        }
        updated
    }

    pub fn get(&self, ain: &str) -> Option<&Device> {
        self.index.get(ain).and_then(|&i| self.devices.get(i))
    }

    fn get_mut(&mut self, ain: &str) -> Option<&mut Device> {
        let i = *self.index.get(ain)?;
        self.devices.get_mut(i)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Monitored devices refreshed this cycle, in router order.
    pub fn publishable(&self) -> Vec<&Device> {
        self.devices.iter().filter(|d| d.is_publishable()).collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fritzha_api::models::from_xml;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{DeviceType, MeasurementKind};

    const LIST: &str = r#"<devicelist version="1">
      <device identifier="08761 0000434" productname="FRITZ!DECT 200">
        <present>1</present><name>Waschmaschine</name>
        <switch><state>1</state></switch>
        <powermeter><voltage>230000</voltage><power>4820</power><energy>707</energy></powermeter>
        <temperature><celsius>215</celsius></temperature>
      </device>
      <device identifier="11657 0272633" productname="FRITZ!DECT Repeater 100">
        <present>1</present><name>Repeater</name>
        <temperature><celsius>190</celsius></temperature>
      </device>
      <device identifier="09995 0123456" productname="FRITZ!DECT 301">
        <present>0</present><name>Heizung</name>
      </device>
    </devicelist>"#;

    fn list(xml: &str) -> DeviceList {
        from_xml(xml).unwrap()
    }

    #[test]
    fn empty_list_is_no_devices() {
        let result = Inventory::from_device_list(&list("<devicelist version=\"1\"/>"));
        assert!(matches!(result, Err(CoreError::NoDevices)));
    }

    #[test]
    fn one_device_per_ain() {
        let inv = Inventory::from_device_list(&list(
            r#"<devicelist>
                 <device identifier="08761 0000434" productname="FRITZ!DECT 200"><name>a</name></device>
                 <device identifier="087610000434" productname="FRITZ!DECT 200"><name>b</name></device>
                 <device identifier="11657 0272633" productname="FRITZ!DECT Repeater 100"/>
               </devicelist>"#,
        ))
        .unwrap();
        assert_eq!(inv.len(), 2);
        assert_eq!(inv.get("087610000434").unwrap().name.as_deref(), Some("a"));
        assert!(inv.get("116570272633").is_some());
    }

    #[test]
    fn types_follow_product_names() {
        let inv = Inventory::from_device_list(&list(LIST)).unwrap();
        let types: Vec<_> = inv.devices().iter().map(|d| d.device_type).collect();
        assert_eq!(
            types,
            vec![DeviceType::Switch, DeviceType::Repeater, DeviceType::Unknown]
        );
        assert!(inv.get("087610000434").unwrap().capabilities.has_state);
    }

    #[test]
    fn reconcile_copies_configuration_and_reports_gaps() {
        let mut inv = Inventory::from_device_list(&list(LIST)).unwrap();
        let report = inv.reconcile(&[
            DeviceConfig::new("08761 0000434")
                .with_location("Keller", "Waschraum")
                .monitoring([MeasurementKind::Power, MeasurementKind::Energy]),
            DeviceConfig::new("11657 0272633").with_location("Flur", "OG"),
            DeviceConfig::new("99999 9999999").monitoring([MeasurementKind::Power]),
        ]);

        assert_eq!(report.orphaned, vec!["999999999999".to_owned()]);
        assert_eq!(report.unconfigured, vec!["099950123456".to_owned()]);
        assert_eq!(report.matched.len(), 2);

        let plug = inv.get("087610000434").unwrap();
        assert!(plug.is_monitored);
        assert_eq!(plug.location.as_deref(), Some("Keller"));
        assert_eq!(plug.sublocation.as_deref(), Some("Waschraum"));
        assert!(plug.monitored.contains(&MeasurementKind::Energy));

        // Located but no measurements named: tracked, not monitored.
        let repeater = inv.get("116570272633").unwrap();
        assert_eq!(repeater.location.as_deref(), Some("Flur"));
        assert!(!repeater.is_monitored);

        assert!(!inv.get("099950123456").unwrap().is_monitored);
    }

    #[test]
    fn cycle_updates_reported_devices_only() {
        let mut inv = Inventory::from_device_list(&list(LIST)).unwrap();
        let first = Utc::now();
        inv.begin_cycle();
        assert_eq!(inv.apply_measurements(&list(LIST), first), 3);

        let second = first + chrono::Duration::seconds(120);
        inv.begin_cycle();
        let updated = inv.apply_measurements(
            &list(
                r#"<devicelist>
                     <device identifier="11657 0272633" productname="FRITZ!DECT Repeater 100">
                       <temperature><celsius>205</celsius></temperature>
                     </device>
                     <device identifier="55555 5555555" productname="FRITZ!DECT 200"/>
                   </devicelist>"#,
            ),
            second,
        );
        assert_eq!(updated, 1);

        let plug = inv.get("087610000434").unwrap();
        assert!(!plug.up_to_date);
        assert_eq!(plug.measurements.voltage, Some(230.0));
        assert_eq!(plug.measured_at, Some(first));

        let repeater = inv.get("116570272633").unwrap();
        assert!(repeater.up_to_date);
        assert_eq!(repeater.measurements.temperature, Some(20.5));
        assert_eq!(repeater.measured_at, Some(second));

        assert!(inv.get("555555555555").is_none());
    }

    #[test]
    fn publishable_requires_monitored_and_fresh() {
        let mut inv = Inventory::from_device_list(&list(LIST)).unwrap();
        inv.reconcile(&[DeviceConfig::new("087610000434").monitoring([MeasurementKind::Power])]);
        assert!(inv.publishable().is_empty());

        inv.begin_cycle();
        inv.apply_measurements(&list(LIST), Utc::now());
        let ains: Vec<_> = inv.publishable().iter().map(|d| d.ain.as_str()).collect();
        assert_eq!(ains, vec!["087610000434"]);
    }
}
