use std::collections::BTreeMap;

use approx::assert_relative_eq;
use dc_core::{DistributionFunction, Error, Utilities};
use dc_logit::{Coefficient, CrossNestedLogit, MultinomialLogit, NestStructure, NestedLogit};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Mode {
    Car,
    RedBus,
    BlueBus,
}

struct Params {
    lambda_bus: f64,
}

fn red_bus_blue_bus() -> NestedLogit<Mode, Params> {
    let structure = NestStructure::nested(|root| {
        root.option(Mode::Car);
        root.nest("bus", Coefficient::derived(|p: &Params| p.lambda_bus), |bus| {
            bus.option(Mode::RedBus).option(Mode::BlueBus);
        });
    })
    .unwrap();
    NestedLogit::new(structure).unwrap()
}

fn all_zero() -> Utilities<Mode> {
    [(Mode::Car, 0.0), (Mode::RedBus, 0.0), (Mode::BlueBus, 0.0)].into_iter().collect()
}

#[test]
fn nested_logit_limits() {
    let model = red_bus_blue_bus();

    let p = model.probabilities(&all_zero(), &Params { lambda_bus: 1.0 }).unwrap();
    for v in p.values() {
        assert_relative_eq!(*v, 1.0 / 3.0, epsilon = 1e-12);
    }

    let p = model.probabilities(&all_zero(), &Params { lambda_bus: f64::from_bits(1) }).unwrap();
    assert_relative_eq!(p[&Mode::Car], 0.5, epsilon = 1e-12);
    assert_relative_eq!(p[&Mode::RedBus], 0.25, epsilon = 1e-12);
    assert_relative_eq!(p[&Mode::BlueBus], 0.25, epsilon = 1e-12);
}

#[test]
fn same_structure_serves_many_parameter_sets() {
    let model = red_bus_blue_bus();
    let mut previous = 0.0;
    for lambda in [0.1, 0.3, 0.6, 1.0] {
        let p = model.probabilities(&all_zero(), &Params { lambda_bus: lambda }).unwrap();
        // A less correlated bus nest takes more share from the car.
        let bus = p[&Mode::RedBus] + p[&Mode::BlueBus];
        assert!(bus > previous, "lambda={lambda} bus={bus}");
        previous = bus;
    }
}

#[test]
fn singleton_input_is_certain() {
    let model = red_bus_blue_bus();
    for mode in [Mode::Car, Mode::RedBus, Mode::BlueBus] {
        let u: Utilities<Mode> = [(mode, -3.5)].into_iter().collect();
        let p = model.probabilities(&u, &Params { lambda_bus: 0.4 }).unwrap();
        assert_eq!(p.len(), 1);
        assert_eq!(p[&mode], 1.0);
    }
}

#[test]
fn normalization_over_random_inputs() {
    let nested = red_bus_blue_bus();
    let cross = CrossNestedLogit::new(
        NestStructure::<u32, ()>::cross_nested(|root| {
            root.nest("A", 0.4, |a| {
                a.option_with_alpha(1, 0.3).option(2).option_with_alpha(4, 0.5);
            });
            root.nest("B", 0.8, |b| {
                b.option_with_alpha(1, 0.7).option(3).option_with_alpha(4, 0.5);
            });
        })
        .unwrap(),
    );

    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..200 {
        let mut u = Utilities::new();
        for mode in [Mode::Car, Mode::RedBus, Mode::BlueBus] {
            if rng.random_bool(0.7) {
                u.insert(mode, rng.random_range(-20.0..20.0));
            }
        }
        if u.is_empty() {
            continue;
        }
        let lambda = rng.random_range(0.05..1.0);
        let p = nested.probabilities(&u, &Params { lambda_bus: lambda }).unwrap();
        assert_eq!(p.len(), u.len());
        assert_relative_eq!(p.values().sum::<f64>(), 1.0, epsilon = 1e-9);

        let u: Utilities<u32> = (1..=4).map(|a| (a, rng.random_range(-30.0..30.0))).collect();
        let p = cross.probabilities(&u, &()).unwrap();
        assert_relative_eq!(p.values().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(p.values().all(|v| (0.0..=1.0).contains(v)));

        let p = MultinomialLogit.probabilities(&u).unwrap();
        assert_relative_eq!(p.values().sum::<f64>(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn extreme_utilities_stay_finite() {
    let model = red_bus_blue_bus();
    let u: Utilities<Mode> =
        [(Mode::Car, 1.0), (Mode::RedBus, 800.0), (Mode::BlueBus, 800.0)].into_iter().collect();
    let p = model.probabilities(&u, &Params { lambda_bus: 0.5 }).unwrap();
    assert!(p.values().all(|v| v.is_finite()));
    assert!(p[&Mode::Car] < 1e-9);
    assert_relative_eq!(p[&Mode::RedBus], 0.5, epsilon = 1e-9);

    let u: Utilities<Mode> =
        [(Mode::Car, -2000.0), (Mode::RedBus, -2000.0), (Mode::BlueBus, -2000.0)]
            .into_iter()
            .collect();
    let p = model.probabilities(&u, &Params { lambda_bus: 1.0 }).unwrap();
    assert_relative_eq!(p.values().sum::<f64>(), 1.0, epsilon = 1e-9);
}

#[test]
fn infinite_utility_takes_all_mass() {
    let model = red_bus_blue_bus();
    let u: Utilities<Mode> =
        [(Mode::Car, 0.0), (Mode::RedBus, f64::INFINITY), (Mode::BlueBus, 0.0)]
            .into_iter()
            .collect();
    let p = model.probabilities(&u, &Params { lambda_bus: 0.5 }).unwrap();
    assert_eq!(p[&Mode::RedBus], 1.0);
    assert_eq!(p[&Mode::Car], 0.0);
}

#[test]
fn errors_are_reported_not_corrected() {
    let model = red_bus_blue_bus();
    let p = Params { lambda_bus: 0.5 };
    assert!(matches!(model.probabilities(&BTreeMap::new(), &p), Err(Error::EmptyInput)));
    assert!(matches!(
        model.probabilities(&all_zero(), &Params { lambda_bus: -1.0 }),
        Err(Error::Validation(_))
    ));

    let cross = CrossNestedLogit::new(
        NestStructure::<&str, ()>::cross_nested(|root| {
            root.nest("A", 1.0, |a| {
                a.option_with_alpha("x", 0.6).option_with_alpha("y", 0.9);
            });
            root.nest("B", 1.0, |b| {
                b.option_with_alpha("x", 0.6).option_with_alpha("y", 0.1);
            });
        })
        .unwrap(),
    );
    let u: Utilities<&str> = [("x", 0.0), ("y", 0.0)].into_iter().collect();
    let err = cross.probabilities(&u, &()).unwrap_err();
    assert!(err.to_string().contains("\"x\""), "{err}");
    assert!(!err.to_string().contains("\"y\""), "{err}");

    // Alternatives with several leaves still resolve; every unknown one is named.
    let u: Utilities<&str> = [("x", 0.0), ("plane", 1.0), ("train", 2.0)].into_iter().collect();
    match cross.probabilities(&u, &()) {
        Err(Error::UnknownAlternative(names)) => {
            assert_eq!(names, vec!["\"plane\"".to_string(), "\"train\"".to_string()]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn concurrent_evaluation_shares_one_structure() {
    let model = red_bus_blue_bus();
    let expected = model.probabilities(&all_zero(), &Params { lambda_bus: 0.5 }).unwrap();

    std::thread::scope(|s| {
        for t in 0..8 {
            let model = &model;
            let expected = &expected;
            s.spawn(move || {
                for i in 0..500 {
                    let p = model.probabilities(&all_zero(), &Params { lambda_bus: 0.5 }).unwrap();
                    assert_eq!(&p, expected, "thread {t} iteration {i}");
                    let sub: Utilities<Mode> = [(Mode::Car, 0.0)].into_iter().collect();
                    let p = model.probabilities(&sub, &Params { lambda_bus: 0.5 }).unwrap();
                    assert_eq!(p[&Mode::Car], 1.0);
                }
            });
        }
    });
}

#[test]
fn distribution_trait_objects() {
    let dists: Vec<Box<dyn DistributionFunction<Mode, Params>>> =
        vec![Box::new(MultinomialLogit), Box::new(red_bus_blue_bus())];
    for d in &dists {
        let p = d.calculate_probabilities(&all_zero(), &Params { lambda_bus: 1.0 }).unwrap();
        assert_relative_eq!(p[&Mode::Car], 1.0 / 3.0, epsilon = 1e-12);
    }
}
