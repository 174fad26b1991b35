use std::fmt::{self, Write};

use super::xml::escape_attr;
use super::{FlowBatch, ManualVehicle};

pub const FIXED_ROUTES_FILE: &str = "fixed.rou.xml";
pub const RANDOM_ROUTES_FILE: &str = "random.rou.xml";

const MANUAL_VTYPE: &str = "manual_car";
const FLOW_VTYPE: &str = "fixed_fleet";

/// Route file for explicitly placed vehicles and flow batches.
///
/// Always produced, even when empty, so the traffic configuration never
/// points at a missing file.
pub fn fixed_routes_xml(
    manual: &[ManualVehicle],
    flows: &[FlowBatch],
    duration_s: u32,
) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_fixed_routes(&mut out, manual, flows, duration_s);
    out
}

fn write_fixed_routes(
    out: &mut String,
    manual: &[ManualVehicle],
    flows: &[FlowBatch],
    duration_s: u32,
) -> fmt::Result {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, "<routes>")?;
    writeln!(
        out,
        r#"    <vType id="{MANUAL_VTYPE}" accel="2.6" decel="4.5" sigma="0.5" length="5" maxSpeed="70" color="0,1,0"/>"#
    )?;
    writeln!(
        out,
        r#"    <vType id="{FLOW_VTYPE}" accel="2.6" decel="4.5" sigma="0.5" length="5" maxSpeed="70"/>"#
    )?;

    for vehicle in manual {
        let arrival = if vehicle.full_traversal {
            r#" arrivalPos="max""#
        } else {
            ""
        };
        writeln!(
            out,
            r#"    <trip id="v{}" type="{MANUAL_VTYPE}" depart="0" from="{}" to="{}" departPos="0"{arrival}/>"#,
            vehicle.index,
            escape_attr(&vehicle.from.edge_id),
            escape_attr(&vehicle.to.edge_id),
        )?;
    }

    for flow in flows {
        let positions = if flow.full_traversal {
            r#" departPos="0" arrivalPos="max""#
        } else {
            ""
        };
        writeln!(
            out,
            r#"    <flow id="fixed_{}" type="{FLOW_VTYPE}" begin="0" end="{duration_s}" number="{}" from="{}" to="{}"{positions}/>"#,
            flow.batch,
            flow.count,
            escape_attr(&flow.from.edge_id),
            escape_attr(&flow.to.edge_id),
        )?;
    }

    writeln!(out, "</routes>")
}
