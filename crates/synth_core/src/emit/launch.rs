use std::fmt::{self, Write};

use super::xml::escape_attr;
use super::ResolvedScenario;

pub const SUMOCFG_FILE: &str = "simulation.sumocfg";
pub const LAUNCHD_FILE: &str = "simulation.launchd.xml";
pub const DEMO_FILE: &str = "demo.xml";
pub const OMNETPP_FILE: &str = "omnetpp.ini";
pub const PACKAGE_FILE: &str = "package.ned";
const TRACI_PORT: u16 = 9999;

/// `package.ned` declaring the scenario package.
pub fn package_ned(scenario: &ResolvedScenario) -> String {
    format!("package {};\n", scenario.layout.package())
}

/// Traffic simulator configuration (`simulation.sumocfg`).
pub fn sumocfg(scenario: &ResolvedScenario) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_sumocfg(&mut out, scenario);
    out
}

fn write_sumocfg(out: &mut String, scenario: &ResolvedScenario) -> fmt::Result {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, "<configuration>")?;
    writeln!(out, "    <input>")?;
    writeln!(
        out,
        r#"        <net-file value="{}"/>"#,
        escape_attr(&scenario.map_file)
    )?;
    writeln!(
        out,
        r#"        <route-files value="{}"/>"#,
        scenario.route_files().join(",")
    )?;
    writeln!(out, "    </input>")?;
    writeln!(out, "    <time>")?;
    writeln!(out, r#"        <begin value="0"/>"#)?;
    writeln!(out, r#"        <end value="{}"/>"#, scenario.duration_s)?;
    writeln!(out, "    </time>")?;
    writeln!(out, "</configuration>")
}

/// Launch descriptor telling the Veins launch daemon which files to copy and
/// how to start the traffic simulator.
pub fn launchd_xml(scenario: &ResolvedScenario) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_launchd(&mut out, scenario);
    out
}

fn write_launchd(out: &mut String, scenario: &ResolvedScenario) -> fmt::Result {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, "<launchd>")?;
    let map = scenario.map_file.as_str();
    let copies = [map, SUMOCFG_FILE, OMNETPP_FILE, DEMO_FILE]
        .into_iter()
        .chain(scenario.route_files());
    for file in copies {
        writeln!(out, r#"    <copy file="{}"/>"#, escape_attr(file))?;
    }
    writeln!(
        out,
        r#"    <run command="sumo-gui -c {SUMOCFG_FILE} --remote-port {TRACI_PORT}"/>"#
    )?;
    writeln!(out, "</launchd>")
}

/// IPv4 configurator input referenced by the topology.
pub fn demo_xml() -> String {
    concat!(
        "<config>\n",
        "    <interface hosts=\"**\" address=\"10.x.x.x\" netmask=\"255.x.x.x\"/>\n",
        "    <multicast-group hosts=\"**\" address=\"224.0.0.1\"/>\n",
        "</config>\n",
    )
    .to_string()
}
