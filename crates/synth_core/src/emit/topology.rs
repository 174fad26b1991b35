use std::fmt::{self, Write};

use crate::allocator::EntityClass;

use super::ResolvedScenario;

pub const NED_FILE: &str = "simulation.ned";

/// How an entity class moves in the network simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobilityTemplate {
    /// Airborne, `LinearMobility` at a fixed altitude.
    Linear,
    StaticGrid,
}

impl MobilityTemplate {
    pub fn typename(self) -> &'static str {
        match self {
            Self::Linear => "LinearMobility",
            Self::StaticGrid => "StaticGridMobility",
        }
    }
}

/// Declaration details of an entity class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassSpec {
    pub ned_type: &'static str,
    pub icon: &'static str,
    pub module_prefix: &'static str,
    pub mobility: MobilityTemplate,
}

const MOBILE_JAMMER: ClassSpec = ClassSpec {
    ned_type: "DroneJammer",
    icon: "device/drone",
    module_prefix: "jammer",
    mobility: MobilityTemplate::Linear,
};

const STATIC_JAMMER: ClassSpec = ClassSpec {
    ned_type: "NRJammer",
    icon: "device/antennatower",
    module_prefix: "jammer",
    mobility: MobilityTemplate::StaticGrid,
};

const ROADSIDE_UNIT: ClassSpec = ClassSpec {
    ned_type: "RSUNR",
    icon: "device/antennatower",
    module_prefix: "rsu",
    mobility: MobilityTemplate::StaticGrid,
};

pub fn class_spec(class: EntityClass) -> &'static ClassSpec {
    match class {
        EntityClass::MobileJammer => &MOBILE_JAMMER,
        EntityClass::StaticJammer => &STATIC_JAMMER,
        EntityClass::RoadsideUnit => &ROADSIDE_UNIT,
    }
}

const IMPORTS: &[&str] = &[
    "inet.networklayer.configurator.ipv4.Ipv4NetworkConfigurator",
    "inet.networklayer.ipv4.RoutingTableRecorder",
    "inet.node.inet.StandardHost",
    "inet.node.inet.Router",
    "simu5g.common.binder.Binder",
    "simu5g.nodes.Upf",
    "simu5g.world.radio.LteChannelControl",
    "simu5g.common.carrierAggregation.CarrierAggregation",
    "de.hshl.b5gcybertestv2x.nodes.gNB",
    "de.hshl.b5gcybertestv2x.nodes.CarV2X",
    "de.hshl.b5gcybertestv2x.nodes.NR.NRJammer",
    "de.hshl.b5gcybertestv2x.nodes.jammers.DroneJammer",
    "de.hshl.b5gcybertestv2x.nodes.NR.RSUNR",
    "org.car2x.veins.subprojects.veins_inet.VeinsInetManager",
];

/// Core infrastructure every scenario declares, in order.
const INFRASTRUCTURE: &[(&str, &str, &str)] = &[
    (
        "routingRecorder",
        "RoutingTableRecorder",
        r#"@display("p=50,75;is=s");"#,
    ),
    (
        "configurator",
        "Ipv4NetworkConfigurator",
        r#"@display("p=50,125"); config = xmldoc("demo.xml");"#,
    ),
    (
        "veinsManager",
        "VeinsInetManager",
        r#"@display("p=50,227;is=s");"#,
    ),
    (
        "channelControl",
        "LteChannelControl",
        r#"@display("p=50,25;is=s");"#,
    ),
    ("binder", "Binder", r#"@display("p=50,175;is=s");"#),
    (
        "carrierAggregation",
        "CarrierAggregation",
        r#"@display("p=50,250;is=s");"#,
    ),
    (
        "server",
        "StandardHost",
        r#"@display("p=660,136;i=device/server");"#,
    ),
    (
        "router",
        "Router",
        r#"@display("p=561,135;i=device/smallrouter");"#,
    ),
    ("upf", "Upf", r#"@display("p=462,136");"#),
    ("gNodeB1", "gNB", r#"@display("p=150,150;is=vl");"#),
];

const CONNECTIONS: &[&str] = &[
    "server.pppg++ <--> Eth10G <--> router.pppg++;",
    "router.pppg++ <--> Eth10G <--> upf.filterGate;",
    "upf.pppg++ <--> Eth10G <--> gNodeB1.ppp;",
];

/// Network topology declaration (`simulation.ned`).
pub fn simulation_ned(scenario: &ResolvedScenario) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_ned(&mut out, scenario);
    out
}

fn write_ned(out: &mut String, scenario: &ResolvedScenario) -> fmt::Result {
    let layout = &scenario.layout;
    writeln!(out, "package {};", layout.package())?;
    writeln!(out)?;
    for import in IMPORTS {
        writeln!(out, "import {import};")?;
    }
    writeln!(out)?;

    writeln!(out, "network {}", layout.name())?;
    writeln!(out, "{{")?;
    writeln!(out, "    parameters:")?;
    writeln!(out, "        double playgroundSizeX @unit(m);")?;
    writeln!(out, "        double playgroundSizeY @unit(m);")?;
    writeln!(out, "        double playgroundSizeZ @unit(m);")?;
    writeln!(out, r#"        @display("bgb=1000,1000");"#)?;
    writeln!(out)?;

    writeln!(out, "    submodules:")?;
    for (name, ned_type, body) in INFRASTRUCTURE {
        writeln!(out, "        {name}: {ned_type} {{ {body} }}")?;
    }
    writeln!(out, "        car[{}]: CarV2X;", scenario.vehicle_count())?;
    for entity in &scenario.statics {
        let spec = class_spec(entity.class);
        writeln!(
            out,
            r#"        {}: {} {{ @display("i={}"); }}"#,
            entity.module_name(),
            spec.ned_type,
            spec.icon
        )?;
    }
    writeln!(out)?;

    writeln!(out, "    connections allowunconnected:")?;
    for connection in CONNECTIONS {
        writeln!(out, "        {connection}")?;
    }
    writeln!(out, "}}")
}
