use std::fmt::{self, Write};

use crate::allocator::VehicleCategory;
use crate::request::{AppDefaults, VehicleSettings};

use super::topology::{class_spec, MobilityTemplate};
use super::{BatchedSpan, ResolvedScenario, StaticEntity, StaticSettings};

const VEINS_PORT: u16 = 9999;
const VEHICLE_MODULE_TYPE: &str = "de.hshl.b5gcybertestv2x.nodes.CarV2X";

/// Parameter configuration (`omnetpp.ini`).
pub fn omnetpp_ini(scenario: &ResolvedScenario) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_ini(&mut out, scenario);
    out
}

fn write_ini(out: &mut String, scenario: &ResolvedScenario) -> fmt::Result {
    let defaults = &scenario.defaults;
    let app = &defaults.app;

    writeln!(out, "[General]")?;
    writeln!(out, "network = {}", scenario.layout.network_ref())?;
    writeln!(out, "sim-time-limit = {}s", scenario.duration_s)?;
    writeln!(out, "seed-set = {}", scenario.seed)?;
    writeln!(out)?;

    writeln!(out, "# Veins manager")?;
    writeln!(out, r#"*.veinsManager.host = "localhost""#)?;
    writeln!(out, "*.veinsManager.port = {VEINS_PORT}")?;
    writeln!(
        out,
        r#"*.veinsManager.moduleType = "{VEHICLE_MODULE_TYPE}""#
    )?;
    writeln!(out, r#"*.veinsManager.moduleName = "car""#)?;
    writeln!(
        out,
        r#"*.veinsManager.launchConfig = xmldoc("simulation.launchd.xml")"#
    )?;
    writeln!(out, "*.veinsManager.updateInterval = 0.1s")?;
    writeln!(out)?;

    writeln!(out, "# 5G network")?;
    writeln!(
        out,
        "*.gNodeB*.phy.txPower = {}dBm",
        defaults.gnb_tx_power_dbm
    )?;
    writeln!(out, "**.scalar-recording = true")?;
    writeln!(out, "**.vector-recording = true")?;
    writeln!(out)?;

    writeln!(out, "# Server")?;
    writeln!(out, "*.server.numApps = 1")?;
    writeln!(out, r#"*.server.app[0].typename = "VoIPReceiver""#)?;
    writeln!(out, "*.server.app[0].localPort = {}", app.dest_port)?;
    writeln!(out)?;

    writeln!(out, "# Attack response")?;
    writeln!(
        out,
        "*.car[*].mitigation.rerouteOnAttack = {}",
        app.reroute_on_attack
    )?;

    for vehicle in &scenario.manual {
        writeln!(out)?;
        writeln!(out, "# Car {} (manual)", vehicle.index)?;
        let selector = format!("car[{}]", vehicle.index);
        write_vehicle_block(out, &selector, app, &vehicle.settings, "uniform(0s, 1s)")?;
    }

    let batch_settings = VehicleSettings::from_defaults(app);
    for span in scenario.batched_spans() {
        writeln!(out)?;
        writeln!(out, "# {}", span_label(&span))?;
        write_vehicle_block(
            out,
            &span.selector(),
            app,
            &batch_settings,
            "uniform(0s, 5s)",
        )?;
    }

    for entity in &scenario.statics {
        writeln!(out)?;
        write_static_block(out, entity)?;
    }

    Ok(())
}

fn span_label(span: &BatchedSpan) -> String {
    let parts: Vec<String> = span
        .categories
        .iter()
        .map(|category| match category {
            VehicleCategory::Manual => "manual cars".to_string(),
            VehicleCategory::Flow { batch } => format!("flow batch {batch}"),
            VehicleCategory::Background => "background cars".to_string(),
            VehicleCategory::Margin => "spare car slots".to_string(),
        })
        .collect();
    format!(
        "{} ({}..{})",
        parts.join(", "),
        span.start_index,
        span.end_index_exclusive - 1
    )
}

/// Quoted ini string value.
fn ini_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn write_vehicle_block(
    out: &mut String,
    selector: &str,
    app: &AppDefaults,
    settings: &VehicleSettings,
    start_time: &str,
) -> fmt::Result {
    writeln!(out, "*.{selector}.numApps = 1")?;
    writeln!(
        out,
        "*.{selector}.app[0].typename = {}",
        ini_string(&app.typename)
    )?;
    writeln!(
        out,
        "*.{selector}.app[0].destAddress = {}",
        ini_string(&app.dest_address)
    )?;
    writeln!(out, "*.{selector}.app[0].destPort = {}", app.dest_port)?;
    writeln!(out, "*.{selector}.app[0].startTime = {start_time}")?;
    writeln!(
        out,
        "*.{selector}.app[0].sendInterval = {}s",
        settings.send_interval_s
    )?;
    writeln!(
        out,
        "*.{selector}.app[0].packetSize = {}B",
        settings.packet_size_b
    )?;
    writeln!(
        out,
        "*.{selector}.phy.txPower = {}dBm",
        settings.tx_power_dbm
    )?;
    writeln!(
        out,
        "*.{selector}.mitigation.active = {}",
        settings.mitigation
    )
}

fn write_static_block(out: &mut String, entity: &StaticEntity) -> fmt::Result {
    let name = entity.module_name();
    let mobility = class_spec(entity.class).mobility;

    match entity.settings {
        StaticSettings::Jammer(_) => {
            writeln!(out, "# Jammer {} ({:?})", entity.index, entity.class)?
        }
        StaticSettings::RoadsideUnit(_) => writeln!(out, "# RSU {}", entity.index)?,
    }
    writeln!(
        out,
        r#"*.{name}.mobility.typename = "{}""#,
        mobility.typename()
    )?;
    writeln!(out, "*.{name}.mobility.initialX = {:.2}m", entity.x)?;
    writeln!(out, "*.{name}.mobility.initialY = {:.2}m", entity.y)?;

    match entity.settings {
        StaticSettings::Jammer(jammer) => {
            if mobility == MobilityTemplate::Linear {
                writeln!(out, "*.{name}.mobility.initialZ = {}m", jammer.altitude_m)?;
                writeln!(out, "*.{name}.mobility.speed = {}mps", jammer.speed_mps)?;
            }
            writeln!(out, r#"*.{name}.app[0].typename = "JammerApp""#)?;
            writeln!(out, "*.{name}.app[0].startTime = {}s", jammer.start_s)?;
            writeln!(out, "*.{name}.app[0].stopTime = {}s", jammer.stop_s)?;
            writeln!(
                out,
                r#"*.{name}.jammerType = "{}""#,
                jammer.strategy.as_str()
            )?;
            writeln!(out, "*.{name}.transmissionPower = {}dBm", jammer.power_dbm)?;
            writeln!(out, "*.{name}.active = true")
        }
        StaticSettings::RoadsideUnit(rsu) => {
            writeln!(out, "*.{name}.phy.txPower = {}dBm", rsu.tx_power_dbm)
        }
    }
}
