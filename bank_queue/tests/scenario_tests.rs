// End-to-end runs checking queueing invariants and reference scenarios

use approx::assert_relative_eq;
use bank_queue::{
    run_simulation, ArrivalGenerator, Customer, Event, Monitor, Reply, RunContext, SimError,
    SimulationConfig, Station, Summary, TriangularParams, WaitAccounting,
};
use des::{Agent, EventLoop, ProcessFault, ProcessId};

const EPS: f64 = 1e-9;

fn scenario_a(seed: u64) -> SimulationConfig {
    SimulationConfig::new(
        1000.0,
        5,
        0.75,
        TriangularParams::new(1.0, 2.0, 4.0),
        TriangularParams::new(2.0, 4.0, 6.0),
        1.0,
        1.0,
    )
    .with_seed(seed)
}

fn single_cashier_overloaded(seed: u64) -> SimulationConfig {
    // mean service 4 > mean interarrival 2
    SimulationConfig::new(
        1000.0,
        1,
        0.5,
        TriangularParams::new(1.0, 2.0, 4.0),
        TriangularParams::new(2.0, 4.0, 6.0),
        0.0,
        0.0,
    )
    .with_seed(seed)
}

#[test]
fn scenario_a_atm_then_cashier_for_everyone() {
    let result = run_simulation(&scenario_a(2024)).unwrap();

    assert!(result.finished_count > 0);
    // every customer pays at least one ATM and one cashier lower bound
    assert!(result.sojourn_times.iter().all(|&s| s >= 3.0 - EPS));
    let utilization = result.cashier_utilization().unwrap();
    assert!(utilization > 0.0 && utilization < 1.0, "cashier utilization {utilization}");
    // one wait per visit: every finished customer made two grants
    assert!(result.wait_times.len() >= 2 * result.finished_count);
}

#[test]
fn scenario_b_no_arrivals_reports_empty_state() {
    let mut config = scenario_a(7);
    config.horizon = 100.0;
    config.arrival_rate = 1e-9;

    let result = run_simulation(&config).unwrap();

    assert_eq!(result.finished_count, 0);
    assert_eq!(result.atm_busy_accum, 0.0);
    assert_eq!(result.cashier_busy_accum, 0.0);
    assert_eq!(result.summary(), Summary::Empty { arrivals: 0 });
    assert_eq!(result.mean_sojourn(), None);
    assert_eq!(result.mean_wait(), None);
    assert_eq!(result.cashier_utilization(), None);
    // the monitor still ran: samples at t = 0, 1, ..., 99
    assert_eq!(result.samples.len(), 100);
}

#[test]
fn horizon_shorter_than_any_service_reports_empty_state() {
    // heavy traffic, but no cashier service can end before t = 2
    let config = SimulationConfig::new(
        2.0,
        5,
        50.0,
        TriangularParams::new(1.0, 2.0, 4.0),
        TriangularParams::new(5.0, 6.0, 7.0),
        0.0,
        0.0,
    )
    .with_seed(13);

    let result = run_simulation(&config).unwrap();

    assert!(result.arrivals > 0);
    assert_eq!(result.finished_count, 0);
    assert!(result.sojourn_times.is_empty());
    assert_eq!(result.summary(), Summary::Empty { arrivals: result.arrivals });
    assert_eq!(result.mean_sojourn(), None);
    assert_eq!(result.cashier_utilization(), None);
    assert_eq!(result.in_flight(), result.arrivals);
    // the first five walked straight up to a free cashier
    assert_eq!(result.wait_times.len(), 5.min(result.arrivals));
}

#[test]
fn scenario_c_single_cashier_builds_a_queue() {
    let result = run_simulation(&single_cashier_overloaded(99)).unwrap();

    let queued_samples = result
        .samples
        .iter()
        .filter(|s| s.cashier_queue_len > 0)
        .count();
    assert!(queued_samples > 1, "queue seen at {queued_samples} samples");

    let waited = result.wait_times.iter().filter(|&&w| w > 0.0).count();
    assert!(
        waited * 2 > result.wait_times.len(),
        "{waited} of {} customers waited",
        result.wait_times.len()
    );
}

#[test]
fn capacity_holds_at_every_sample() {
    for seed in 0..5 {
        let config = SimulationConfig::baseline().with_seed(seed);
        let config = SimulationConfig {
            horizon: 2_000.0,
            arrival_rate: 2.0,
            ..config
        };
        let result = run_simulation(&config).unwrap();

        assert!(result.samples.iter().all(|s| s.atm_in_service <= config.num_atms));
        assert!(result.samples.iter().all(|s| s.cashier_in_service <= config.num_cashiers));
    }
}

#[test]
fn samples_are_taken_every_time_unit() {
    let result = run_simulation(&scenario_a(3)).unwrap();

    assert_eq!(result.samples.len(), 1000);
    for (i, sample) in result.samples.iter().enumerate() {
        assert_relative_eq!(sample.timestamp, i as f64);
    }
}

#[test]
fn finished_customers_are_conserved() {
    let result = run_simulation(&SimulationConfig::baseline().with_seed(11)).unwrap();

    assert_eq!(result.sojourn_times.len(), result.finished_count);
    assert!(result.finished_count <= result.arrivals);
    assert!(result.sojourn_times.iter().all(|&s| s > 0.0));
    assert!(result.wait_times.iter().all(|&w| w >= 0.0));
}

#[test]
fn unfinished_customers_are_all_held_by_a_resource() {
    for seed in 0..5 {
        let config = SimulationConfig::baseline().with_seed(seed);
        let config = SimulationConfig {
            horizon: 500.0,
            ..config
        };
        let mut event_loop: EventLoop<Event, RunContext> =
            EventLoop::new(RunContext::new(&config).unwrap());
        event_loop.spawn(Box::new(Monitor::new(config.sample_interval)), Event::Start);
        event_loop.spawn(Box::new(ArrivalGenerator::new()), Event::Start);

        event_loop.run(config.horizon).unwrap();

        let ctx = event_loop.context();
        let on_resources: usize = [Station::Atm, Station::Cashier]
            .into_iter()
            .map(|s| ctx.resource(s).in_service() + ctx.resource(s).queue_len())
            .sum();
        let in_flight = ctx.stats.arrivals() - ctx.stats.finished_count();
        assert_eq!(on_resources, in_flight, "seed {seed}");
        // plus the monitor and the arrival generator
        assert_eq!(event_loop.active_processes(), in_flight + 2);

        let result = event_loop.into_context().stats.into_result(&config);
        assert_eq!(result.in_flight(), in_flight);
    }
}

#[test]
fn utilization_stays_within_unit_interval() {
    let configs = [
        scenario_a(1),
        single_cashier_overloaded(1),
        SimulationConfig::baseline().with_seed(1),
    ];
    for config in configs {
        let result = run_simulation(&config).unwrap();
        for station in [Station::Atm, Station::Cashier] {
            let u = result.utilization(station).unwrap();
            assert!((0.0..=1.0).contains(&u), "{station} utilization {u}");
        }
    }
}

#[test]
fn overloaded_single_cashier_is_nearly_always_busy() {
    let result = run_simulation(&single_cashier_overloaded(5)).unwrap();

    assert!(result.cashier_utilization().unwrap() > 0.95);
    assert!(result.sampled_cashier_utilization().unwrap() > 0.95);
}

#[test]
fn seeded_runs_are_reproducible() {
    let first = run_simulation(&scenario_a(42)).unwrap();
    let second = run_simulation(&scenario_a(42)).unwrap();

    assert_eq!(first.sojourn_times, second.sojourn_times);
    assert_eq!(first.wait_times, second.wait_times);
    assert_eq!(first.samples, second.samples);
}

#[test]
fn since_arrival_waits_are_never_shorter_than_per_visit() {
    let per_visit = run_simulation(&scenario_a(8)).unwrap();
    let since_arrival =
        run_simulation(&scenario_a(8).with_wait_accounting(WaitAccounting::SinceArrival)).unwrap();

    // same random stream, so the same grants happen in the same order
    assert_eq!(per_visit.wait_times.len(), since_arrival.wait_times.len());
    for (a, b) in per_visit.wait_times.iter().zip(&since_arrival.wait_times) {
        assert!(b + EPS >= *a);
    }
}

#[test]
fn invalid_configuration_never_starts_the_run() {
    let mut config = scenario_a(1);
    config.cashier_service = TriangularParams::new(6.0, 4.0, 2.0);

    let err = run_simulation(&config).unwrap_err();

    assert!(matches!(err, SimError::Configuration(_)));
}

/// Spawns a customer every `gap` until `remaining` runs out.
struct StaggeredArrivals {
    gap: f64,
    remaining: usize,
}

impl Agent<Event, RunContext> for StaggeredArrivals {
    fn act(
        &mut self,
        _me: ProcessId,
        current_t: f64,
        _data: &Event,
        _ctx: &mut RunContext,
    ) -> Result<Reply, ProcessFault> {
        if self.remaining == 0 {
            return Ok(Reply::new().finish());
        }
        self.remaining -= 1;
        Ok(Reply::event(self.gap, Event::Arrival).spawn(Box::new(Customer::new(current_t)), Event::Start))
    }
}

#[test]
fn queued_customers_are_served_in_arrival_order() {
    // deterministic cashier service of 4 and arrivals every 0.5
    let config = SimulationConfig::new(
        100.0,
        1,
        1.0,
        TriangularParams::new(1.0, 1.0, 1.0),
        TriangularParams::new(4.0, 4.0, 4.0),
        0.0,
        0.0,
    )
    .with_seed(1);
    let ctx = RunContext::new(&config).unwrap();
    let mut event_loop: EventLoop<Event, RunContext> = EventLoop::new(ctx);
    event_loop.spawn(
        Box::new(StaggeredArrivals {
            gap: 0.5,
            remaining: 6,
        }),
        Event::Start,
    );

    event_loop.run(config.horizon).unwrap();
    let stats = &event_loop.context().stats;

    // customer k arrives at 0.5k and starts at 4k, so waits 3.5k
    let expected: Vec<f64> = (0..6).map(|k| 3.5 * k as f64).collect();
    assert_eq!(stats.wait_times().len(), expected.len());
    for (got, want) in stats.wait_times().iter().zip(&expected) {
        assert_relative_eq!(*got, *want, epsilon = EPS);
    }
    assert_eq!(stats.finished_count(), 6);
    assert_eq!(event_loop.active_processes(), 0);
}
