use creditsim::penalty::message_penalties;
use creditsim::{PenaltyReport, SchedulerKind, SimParams, Simulation, SizeDistribution};

fn one_or_two() -> SizeDistribution {
    "# half of the messages are one packet, half are two\n0.5 1\n1.0 2\n"
        .parse()
        .unwrap()
}

fn params(steps: u64, rho: f64) -> SimParams {
    SimParams {
        steps,
        rho,
        avg_delay: 3.0,
        fixed_delay: 1,
        seed: "integration".into(),
        drain_limit: None,
    }
}

#[test]
fn every_message_completes_under_both_schedulers() {
    let p = params(1000, 0.3);
    let outcome = Simulation::new(one_or_two(), p.clone()).unwrap().run();
    assert!(!outcome.messages.is_empty());

    for kind in SchedulerKind::ALL.iter() {
        let run = outcome.run(*kind);
        assert!(run.drained);
        for (id, msg) in outcome.messages.iter() {
            let completion = run.departures.completion_time(*id, msg);
            assert!(completion.is_some(), "{} never finished message {}", kind, id);
        }
    }

    // serialization plus the minimum network delay
    for (id, msg) in outcome.messages.iter() {
        let completion = outcome.ideal.departures.completion_time(*id, msg).unwrap();
        assert!(
            completion >= p.fixed_delay + msg.size - 1,
            "message {} of size {} completed in {}",
            id,
            msg.size,
            completion
        );
    }

    let report = PenaltyReport::from_outcome(&outcome);
    assert_eq!(report.compared(), outcome.messages.len());
}

#[test]
fn departures_record_remaining_size_and_priority() {
    let outcome = Simulation::new(one_or_two(), params(1000, 0.3)).unwrap().run();
    for (id, msg) in outcome.messages.iter() {
        let mut remaining: Vec<_> = outcome
            .ideal
            .departures
            .packets(*id)
            .iter()
            .map(|d| {
                assert_eq!(d.priority, d.remaining_size);
                d.remaining_size
            })
            .collect();
        remaining.sort_unstable();
        assert_eq!(remaining, (1..=msg.size).collect::<Vec<_>>());

        assert!(outcome
            .simple
            .departures
            .packets(*id)
            .iter()
            .all(|d| d.priority == 0));
    }
}

#[test]
fn fixed_seed_reproduces_departures() {
    let first = Simulation::new(one_or_two(), params(2000, 0.7)).unwrap().run();
    let second = Simulation::new(one_or_two(), params(2000, 0.7)).unwrap().run();
    assert_eq!(first.messages, second.messages);
    assert_eq!(first.simple.departures, second.simple.departures);
    assert_eq!(first.ideal.departures, second.ideal.departures);
}

#[test]
fn ideal_is_not_worse_on_average() {
    let outcome = Simulation::new(one_or_two(), params(20000, 0.5)).unwrap().run();
    let report = PenaltyReport::from_outcome(&outcome);
    assert!(report.compared() > 1000);
    assert!(report.mean_slot_difference() >= 0.0, "{}", report.mean_slot_difference());
    assert!(report.mean_penalty() >= 0.0, "{}", report.mean_penalty());

    let total: f64 = message_penalties(&outcome.messages, &outcome.simple.departures, &outcome.ideal.departures)
        .map(|m| m.slot_difference())
        .sum();
    assert!(total >= 0.0);
}

#[test]
fn zero_steps_compares_nothing() {
    let outcome = Simulation::new(one_or_two(), params(0, 0.5)).unwrap().run();
    assert!(outcome.messages.is_empty());
    assert!(outcome.simple.departures.is_empty());
    assert!(outcome.ideal.departures.is_empty());

    let report = PenaltyReport::from_outcome(&outcome);
    assert_eq!(report.compared(), 0);
    assert_eq!(report.mean_penalty(), 0.0);
}

#[test]
fn invalid_configuration_fails_before_running() {
    assert!(Simulation::new(one_or_two(), params(100, 0.0)).is_err());
    assert!("0.5 1\n0.3 2\n1.0 3\n".parse::<SizeDistribution>().is_err());
    assert!("0.5 1\n0.8 2\n".parse::<SizeDistribution>().is_err());
    assert!("".parse::<SizeDistribution>().is_err());
}

#[test]
fn bundled_distribution_loads() {
    let dist = SizeDistribution::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/input/SizeDistribution")).unwrap();
    assert_eq!(dist.sizes().last(), Some(400));
    assert!(dist.mean() > 1.0);
}
