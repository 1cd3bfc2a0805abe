//! # Lane Control Benchmark

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::Point2;

use sim_if::{
    agent::Intent,
    lane::{LaneId, Waypoint, WaypointPath},
    veh::VehicleState,
};
use util::module::State;
use veh_lib::lane_ctrl::{self, select, track_error, InputData, LaneCtrl, SelectionState};

fn lane_ctrl_benchmark(c: &mut Criterion) {
    // ---- Build a three lane road snapshot ----

    let params = lane_ctrl::Params::default();

    let paths: Vec<WaypointPath> = (0..3)
        .map(|lane| {
            let points = (0..60)
                .map(|i| Waypoint {
                    pos_m: Point2::new(i as f64, lane as f64 * 3.5),
                    heading_rad: 0.0,
                    lane_id: LaneId(lane),
                    half_width_m: 1.75,
                    speed_limit_ms: 10.0,
                    arc_len_m: i as f64,
                })
                .collect();
            WaypointPath::new(points).unwrap()
        })
        .collect();

    let veh = VehicleState {
        pos_m: Point2::new(20.0, 0.4),
        heading_rad: 0.02,
        speed_ms: 8.0,
        steer_rad: 0.0,
    };
    let intent = Intent::cruise(8.0);

    // ---- Individual stages ----

    let committed = SelectionState {
        lane: Some(LaneId(0)),
        ..Default::default()
    };

    c.bench_function("lane_ctrl::select", |b| {
        b.iter(|| select(&paths, &veh, &intent, &committed, &params).unwrap())
    });

    c.bench_function("lane_ctrl::project", |b| {
        b.iter(|| track_error::project(&veh, &paths[0], &params))
    });

    // ---- Full module tick ----

    let mut lane_ctrl = LaneCtrl::with_params(params);
    let input = InputData {
        paths,
        veh,
        intent,
        dt_s: 0.1,
    };

    c.bench_function("LaneCtrl::proc", |b| b.iter(|| lane_ctrl.proc(&input).unwrap()));
}

criterion_group!(benches, lane_ctrl_benchmark);
criterion_main!(benches);
