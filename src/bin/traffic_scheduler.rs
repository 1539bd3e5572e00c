use std::env;
use std::process;
use std::time::Instant;

use traffic_sched_core::io::reader::{
    build_crossings, build_roads, build_vehicles, read_cars, read_crosses, read_roads,
};
use traffic_sched_core::io::writer::write_answer;
use traffic_sched_core::scheduler::{Scheduler, SchedulerError};
use traffic_sched_core::scheduler::config::SchedulerConfig;
use traffic_sched_core::verbose::{set_verbose_level, VerboseLevel};

const USAGE: &str = "usage: traffic_scheduler <car_path> <road_path> <cross_path> <answer_path> \
[--capacity-threshold=F] [--road-block-threshold=F] [--soft-cap=N] [--p-ideal=F] \
[--path-enum-max=N] [--path-probe-max=N] [--seed=N] [--verbose=LEVEL]";

fn fail(message: impl std::fmt::Display, code: i32) -> ! {
    eprintln!("traffic_scheduler: {}", message);
    process::exit(code);
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> T {
    value
        .parse()
        .unwrap_or_else(|_| fail(format!("invalid value for --{}: '{}'", key, value), 1))
}

fn parse_args(args: &[String]) -> (Vec<String>, SchedulerConfig, VerboseLevel) {
    let mut positional = Vec::new();
    let mut config = SchedulerConfig::default();
    let mut verbose = VerboseLevel::None;
    for arg in args {
        let Some(option) = arg.strip_prefix("--") else {
            positional.push(arg.clone());
            continue;
        };
        let (key, value) = option
            .split_once('=')
            .unwrap_or_else(|| fail(format!("option '{}' expects --key=value", arg), 1));
        match key {
            "capacity-threshold" => {
                config = config.with_capacity_threshold(parse_value(key, value))
            }
            "road-block-threshold" => {
                config = config.with_road_block_threshold(parse_value(key, value))
            }
            "soft-cap" => config = config.with_on_road_soft_cap(parse_value(key, value)),
            "p-ideal" => config = config.with_p_ideal(parse_value(key, value)),
            "path-enum-max" => config = config.with_path_enum_max(parse_value(key, value)),
            "path-probe-max" => config = config.with_path_probe_max(parse_value(key, value)),
            "seed" => config = config.with_rng_seed(parse_value(key, value)),
            "verbose" => {
                verbose = VerboseLevel::from_name(value)
                    .unwrap_or_else(|err| fail(err, 1));
            }
            _ => fail(format!("unknown option '--{}'", key), 1),
        }
    }
    (positional, config, verbose)
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let (positional, config, verbose) = parse_args(&args);
    let [car_path, road_path, cross_path, answer_path] = match positional.as_slice() {
        [car, road, cross, answer] => [car, road, cross, answer],
        _ => fail(USAGE, 1),
    };
    set_verbose_level(verbose);

    let started = Instant::now();

    let car_records = read_cars(car_path).unwrap_or_else(|err| fail(err, 1));
    let road_records = read_roads(road_path).unwrap_or_else(|err| fail(err, 1));
    let cross_records = read_crosses(cross_path).unwrap_or_else(|err| fail(err, 1));

    let crosses = build_crossings(&cross_records);
    let roads = build_roads(&road_records, config.road_block_threshold);
    let cars = build_vehicles(&car_records);
    let input_order: Vec<i64> = car_records.iter().map(|record| record.id).collect();

    let mut scheduler = Scheduler::new(crosses, roads, cars, config)
        .unwrap_or_else(|err| fail(err, 1));
    if let Err(err) = scheduler.run() {
        let code = match err {
            SchedulerError::Invariant(_) => 2,
            _ => 1,
        };
        fail(err, code);
    }

    write_answer(answer_path, &input_order, scheduler.vehicles())
        .unwrap_or_else(|err| fail(err, 1));

    let summary = serde_json::json!({
        "session": scheduler.get_id().to_string(),
        "ticks": scheduler.current_time(),
        "vehicles": car_records.len(),
        "arrived": scheduler.arrived().len(),
        "unroutable": scheduler.unroutable().len(),
        "elapsed_ms": started.elapsed().as_millis() as u64,
    });
    println!("{}", summary);
}
