mod support;

use support::{ini_lines, unzip, TestEngine, GRID_MAP};
use synth_core::allocator::{validate_ranges, VehicleCategory};
use synth_core::emit::{NED_FILE, OMNETPP_FILE, RANDOM_ROUTES_FILE, SUMOCFG_FILE};
use synth_core::request::{PlacedEntity, RouteSpec, SimulationRequest};
use synth_core::test_helpers::{GridSpec, ScriptedTripGenerator};
use synth_core::ErrorKind;

#[test]
fn every_category_lands_in_one_contiguous_collection() {
    let env = TestEngine::grid();
    let g = env.grid;
    let manual = PlacedEntity::vehicle(g.horizontal_mid(0, 0), g.horizontal_mid(1, 1));
    let explicit = RouteSpec::explicit(g.horizontal_mid(2, 0), g.horizontal_mid(3, 1));
    let first_flow = RouteSpec::flow(g.horizontal_mid(0, 1), g.horizontal_mid(2, 2), 3);
    let second_flow = RouteSpec::flow(g.horizontal_mid(1, 2), g.horizontal_mid(3, 0), 2);
    let request = SimulationRequest::new("mix", GRID_MAP)
        .with_entity(manual)
        .with_route(explicit)
        .with_route(first_flow)
        .with_route(second_flow)
        .with_background_vehicles(4)
        .with_vehicle_margin(1);

    let bundle = env.engine.synthesize(&request).expect("synthesis");
    let ranges = &bundle.summary.vehicle_ranges;
    let categories: Vec<_> = ranges.iter().map(|r| r.category).collect();
    assert_eq!(
        categories,
        [
            VehicleCategory::Manual,
            VehicleCategory::Flow { batch: 0 },
            VehicleCategory::Flow { batch: 1 },
            VehicleCategory::Background,
            VehicleCategory::Margin,
        ]
    );
    let lengths: Vec<_> = ranges.iter().map(|r| r.len()).collect();
    assert_eq!(lengths, [2, 3, 2, 4, 1]);
    assert_eq!(bundle.summary.vehicle_count, 12);
    validate_ranges(12, ranges).expect("ranges cover the collection");

    let ned = bundle.text(NED_FILE).expect("ned");
    assert!(ned.contains("car[12]: CarV2X;"));

    // Everything after the manual cars runs on the batch defaults.
    let ini = bundle.text(OMNETPP_FILE).expect("ini");
    assert_eq!(ini_lines(ini, "car[2..11]", "numApps").len(), 1);
    assert!(ini_lines(ini, "car[5..6]", "numApps").is_empty());
}

#[test]
fn no_background_means_no_generator_and_no_random_routes() {
    let env = TestEngine::grid();
    let g = env.grid;
    let flow = RouteSpec::flow(g.horizontal_mid(0, 0), g.horizontal_mid(1, 1), 2);
    let request = SimulationRequest::new("quiet", GRID_MAP).with_route(flow);

    let bundle = env.engine.synthesize(&request).expect("synthesis");
    assert_eq!(env.trip_calls(), 0);
    assert!(bundle.artifact(RANDOM_ROUTES_FILE).is_none());
    let sumocfg = bundle.text(SUMOCFG_FILE).expect("sumocfg");
    assert!(sumocfg.contains(r#"<route-files value="fixed.rou.xml"/>"#));
    let files = unzip(&bundle.archive);
    assert!(!files.keys().any(|name| name.ends_with(RANDOM_ROUTES_FILE)));
}

#[test]
fn empty_request_yields_an_empty_but_valid_scenario() {
    let env = TestEngine::grid();
    let bundle = env
        .engine
        .synthesize(&SimulationRequest::new("empty", GRID_MAP))
        .expect("synthesis");
    assert_eq!(bundle.summary.vehicle_count, 0);
    let ned = bundle.text(NED_FILE).expect("ned");
    assert!(ned.contains("car[0]: CarV2X;"));
}

#[test]
fn background_only_request_survives_without_routes() {
    let env = TestEngine::grid();
    let off_map = env.grid.geo_at(-9000.0, -9000.0);
    let request = SimulationRequest::new("filler", GRID_MAP)
        .with_route(RouteSpec::explicit(off_map, off_map))
        .with_background_vehicles(3);

    let bundle = env
        .engine
        .synthesize(&request)
        .expect("background keeps it alive");
    assert_eq!(bundle.skipped_routes().len(), 1);
    assert_eq!(bundle.summary.vehicle_count, 3);
}

#[test]
fn trip_generator_failure_aborts_with_its_diagnostic() {
    let env = TestEngine::with_generator(
        GridSpec::default(),
        ScriptedTripGenerator::failing("Error: no valid edges"),
    );
    let request = SimulationRequest::new("filler", GRID_MAP).with_background_vehicles(3);

    let failure = env.engine.synthesize(&request).expect_err("tool failure");
    assert_eq!(failure.kind(), ErrorKind::ExternalToolFailure);
    assert!(failure.to_string().contains("Error: no valid edges"));
}
