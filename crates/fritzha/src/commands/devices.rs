//! One-shot device listing with current readings.

use std::path::Path;

use tabled::Tabled;

use fritzha_core::{Device, Poller};

use crate::cli::{DevicesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "AIN")]
    ain: String,
    #[tabled(rename = "Type")]
    device_type: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Present")]
    present: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Sublocation")]
    sublocation: String,
    #[tabled(rename = "Monitored")]
    monitored: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Temperature")]
    temperature: String,
}

fn to_row(d: &Device, color: bool) -> DeviceRow {
    let or_dash = |v: Option<&str>| v.map_or_else(|| output::dash(color), str::to_owned);
    let monitored = if d.is_monitored {
        d.monitored
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    } else {
        output::dash(color)
    };

    DeviceRow {
        ain: d.ain.clone(),
        device_type: d.device_type.to_string(),
        name: or_dash(d.name.as_deref()),
        present: match d.present.as_deref() {
            Some("1") => "yes".into(),
            Some(_) => output::warn_text("no", color),
            None => output::dash(color),
        },
        location: or_dash(d.location.as_deref()),
        sublocation: or_dash(d.sublocation.as_deref()),
        monitored,
        state: or_dash(d.state.as_deref()),
        power: d
            .measurements
            .power
            .map_or_else(|| output::dash(color), |w| format!("{w} W")),
        temperature: d
            .measurements
            .temperature
            .map_or_else(|| output::dash(color), |c| format!("{c} °C")),
    }
}

pub async fn handle(
    args: &DevicesArgs,
    config: Option<&Path>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (_, poller_config) = super::load(config)?;
    let mut poller = Poller::start(&poller_config, Vec::new()).await?;

    let cycle = poller.run_cycle().await;
    let orphaned = poller.reconcile_report().orphaned.clone();
    let color = output::should_color(global.color);
    let rendered = cycle.map_err(CliError::from).and_then(|_| {
        output::render_list(
            args.output,
            poller.inventory().devices(),
            |d| to_row(d, color),
            |d| d.ain.clone(),
        )
    });
    poller.close().await;

    output::print_output(&rendered?);
    for ain in orphaned {
        eprintln!(
            "{}",
            output::warn_text(&format!("configured device {ain} is not known to the router"), color)
        );
    }
    Ok(())
}
