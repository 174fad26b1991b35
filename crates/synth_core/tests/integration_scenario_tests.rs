mod support;

use support::{ini_lines, unzip, TestEngine, GRID_MAP};
use synth_core::emit::{FIXED_ROUTES_FILE, NED_FILE, OMNETPP_FILE, RANDOM_ROUTES_FILE, SUMOCFG_FILE};
use synth_core::engine::{RouteSource, SkipReason};
use synth_core::request::{JammerKind, PlacedEntity, RouteSpec, SimulationRequest, VehicleParams};
use synth_core::ErrorKind;

fn request() -> SimulationRequest {
    SimulationRequest::new("Grid Demo", GRID_MAP)
}

#[test]
fn explicit_route_on_one_edge_is_skipped_and_absent() {
    let env = TestEngine::grid();
    let g = env.grid;
    let same_edge = RouteSpec::explicit(g.geo_at(1200.0, 0.0), g.geo_at(1800.0, 0.0));
    let valid = RouteSpec::explicit(g.geo_at(500.0, 1000.0), g.geo_at(2500.0, 2000.0));
    let bundle = env
        .engine
        .synthesize(&request().with_route(same_edge).with_route(valid))
        .expect("synthesis");

    let routes = bundle.text(FIXED_ROUTES_FILE).expect("fixed routes");
    assert!(routes.contains(
        r#"<trip id="v0" type="manual_car" depart="0" from="h1_0" to="h2_2" departPos="0"/>"#
    ));
    assert!(!routes.contains(r#"from="h0_1""#));
    assert!(!routes.contains(r#"id="v1""#));

    let skipped = bundle.skipped_routes();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].source, RouteSource::Route { index: 0 });
    assert_eq!(
        skipped[0].reason,
        SkipReason::SameEdge {
            edge_id: "h0_1".to_string()
        }
    );
}

#[test]
fn flow_on_one_edge_traverses_it_fully() {
    let env = TestEngine::grid();
    let g = env.grid;
    let flow = RouteSpec::flow(g.geo_at(1200.0, 0.0), g.geo_at(1800.0, 0.0), 4);
    let bundle = env
        .engine
        .synthesize(&request().with_route(flow))
        .expect("synthesis");

    let routes = bundle.text(FIXED_ROUTES_FILE).expect("fixed routes");
    assert!(routes.contains(
        r#"<flow id="fixed_0" type="fixed_fleet" begin="0" end="120" number="4" from="h0_1" to="h0_1" departPos="0" arrivalPos="max"/>"#
    ));
    assert!(bundle.skipped_routes().is_empty());
    assert_eq!(bundle.summary.vehicle_count, 4);
}

#[test]
fn manual_and_background_vehicles_share_one_index_space() {
    let env = TestEngine::grid();
    let g = env.grid;
    let mut req = request().with_background_vehicles(5);
    for (row, packet) in [(0, None), (1, Some(512)), (2, None)] {
        req = req.with_entity(PlacedEntity::Vehicle {
            start: g.horizontal_mid(row, 0),
            end: Some(g.horizontal_mid(row, 2)),
            params: VehicleParams {
                packet_size_b: packet,
                ..Default::default()
            },
        });
    }

    let bundle = env.engine.synthesize(&req).expect("synthesis");
    let ranges = &bundle.summary.vehicle_ranges;
    assert_eq!(ranges.len(), 2);
    assert_eq!(
        (ranges[1].start_index, ranges[1].end_index_exclusive),
        (3, 8)
    );

    let ini = bundle.text(OMNETPP_FILE).expect("ini");
    for index in 0..3 {
        assert_eq!(ini_lines(ini, &format!("car[{index}]"), "numApps").len(), 1);
    }
    assert_eq!(
        ini_lines(ini, "car[1]", "app[0].packetSize"),
        ["*.car[1].app[0].packetSize = 512B"]
    );
    assert_eq!(ini_lines(ini, "car[3..7]", "numApps").len(), 1);
    let range_blocks = ini
        .lines()
        .filter(|line| {
            line.starts_with("*.car[") && line.contains("..") && line.ends_with(".numApps = 1")
        })
        .count();
    assert_eq!(range_blocks, 1);

    let ned = bundle.text(NED_FILE).expect("ned");
    assert!(ned.contains("car[8]: CarV2X;"));
    assert!(bundle.artifact(RANDOM_ROUTES_FILE).is_some());
    let sumocfg = bundle.text(SUMOCFG_FILE).expect("sumocfg");
    assert!(sumocfg.contains(r#"<route-files value="fixed.rou.xml,random.rou.xml"/>"#));
    assert_eq!(env.trip_calls(), 1);
}

#[test]
fn unresolvable_point_fails_with_original_coordinates() {
    let env = TestEngine::grid();
    let off_map = env.grid.geo_at(-5000.0, -5000.0);
    let req = request().with_route(RouteSpec::explicit(env.grid.geo_at(500.0, 0.0), off_map));

    let failure = env
        .engine
        .synthesize(&req)
        .expect_err("nothing to simulate");
    assert_eq!(failure.kind(), ErrorKind::GeoResolutionFailure);
    assert_eq!(failure.skipped.len(), 1);
    match &failure.skipped[0].reason {
        SkipReason::Unresolvable { point, max_radius } => {
            assert_eq!(*point, off_map);
            assert_eq!(*max_radius, 500.0);
        }
        other => panic!("unexpected skip {other:?}"),
    }
}

#[test]
fn missing_map_aborts_before_any_work() {
    let env = TestEngine::grid();
    let route = RouteSpec::explicit(env.grid.geo_at(500.0, 0.0), env.grid.geo_at(500.0, 1000.0));
    let req = SimulationRequest::new("demo", "nowhere.net.xml")
        .with_background_vehicles(3)
        .with_route(route);

    let failure = env.engine.synthesize(&req).expect_err("missing map");
    assert_eq!(failure.kind(), ErrorKind::AssetMissing);
    assert!(failure.skipped.is_empty());
    assert_eq!(env.trip_calls(), 0);
    let written: Vec<_> = std::fs::read_dir(env.maps_dir())
        .expect("maps dir")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name())
        .collect();
    assert_eq!(written, [GRID_MAP]);
}

#[test]
fn statics_are_declared_configured_and_numbered_per_class() {
    let env = TestEngine::grid();
    let g = env.grid;
    let drone = PlacedEntity::jammer(g.geo_at(1500.0, 500.0), JammerKind::Mobile);
    let tower = PlacedEntity::jammer(g.geo_at(2500.0, 500.0), JammerKind::Static);
    let req = request()
        .with_background_vehicles(2)
        .with_entity(PlacedEntity::roadside_unit(g.geo_at(200.0, 300.0)))
        .with_entity(drone)
        .with_entity(tower);

    let bundle = env.engine.synthesize(&req).expect("synthesis");
    assert_eq!(bundle.summary.jammers, 2);
    assert_eq!(bundle.summary.roadside_units, 1);

    let ned = bundle.text(NED_FILE).expect("ned");
    assert!(ned.contains(r#"rsu_0: RSUNR { @display("i=device/antennatower"); }"#));
    assert!(ned.contains(r#"jammer_0: DroneJammer { @display("i=device/drone"); }"#));
    assert!(ned.contains(r#"jammer_1: NRJammer { @display("i=device/antennatower"); }"#));

    let ini = bundle.text(OMNETPP_FILE).expect("ini");
    assert_eq!(
        ini_lines(ini, "jammer_0", "mobility.initialX"),
        ["*.jammer_0.mobility.initialX = 1500.00m"]
    );
    assert_eq!(
        ini_lines(ini, "jammer_0", "mobility.initialY"),
        ["*.jammer_0.mobility.initialY = 500.00m"]
    );
    assert_eq!(
        ini_lines(ini, "jammer_0", "mobility.typename"),
        [r#"*.jammer_0.mobility.typename = "LinearMobility""#]
    );
    assert_eq!(
        ini_lines(ini, "jammer_1", "mobility.typename"),
        [r#"*.jammer_1.mobility.typename = "StaticGridMobility""#]
    );
    assert!(ini_lines(ini, "jammer_1", "mobility.speed").is_empty());
    assert_eq!(
        ini_lines(ini, "rsu_0", "mobility.initialX"),
        ["*.rsu_0.mobility.initialX = 200.00m"]
    );
}

#[test]
fn archive_mirrors_the_artifacts_under_one_folder() {
    let env = TestEngine::grid();
    let bundle = env
        .engine
        .synthesize(&request().with_background_vehicles(1))
        .expect("synthesis");

    let entries = unzip(&bundle.archive);
    assert_eq!(entries.len(), bundle.artifacts.len() + 1);
    for artifact in &bundle.artifacts {
        let path = format!("simulations/Grid_Demo/{}", artifact.path);
        assert_eq!(
            entries.get(&path).map(String::as_bytes),
            Some(artifact.content.as_slice())
        );
    }
    assert_eq!(entries["simulations/Grid_Demo/grid.net.xml"], "<net/>\n");
    let package = &entries["simulations/Grid_Demo/package.ned"];
    assert!(package.starts_with("package simulations.Grid_Demo;"));

    let out = tempfile::tempdir().expect("out dir");
    let path = bundle.write_archive(out.path()).expect("write archive");
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("Grid_Demo.zip")
    );
    assert_eq!(std::fs::read(path).expect("read archive"), bundle.archive);
}
