// A single test per binary: the descriptor table must not be touched by
// other tests running concurrently.

use memfd_loader::{run, Settings, StrategyPreference};

mod common;

const CYCLES: usize = 20;

#[test]
fn cycles_release_descriptors_and_paths() {
    let image = common::sample_image();

    let settings = |strategy| Settings {
        strategy,
        resource_name: Some(common::unique_name("leak")),
        ..Default::default()
    };

    // Warm up so one-time loader allocations are not counted.
    run(&image, &settings(StrategyPreference::Memfd)).unwrap();
    let baseline = common::open_descriptor_count();

    for strategy in [StrategyPreference::Memfd, StrategyPreference::Shm] {
        for _ in 0..CYCLES {
            let report = run(&image, &settings(strategy)).unwrap();
            assert_eq!(report.value, 123);
            assert!(
                std::fs::File::open(&report.backing_path).is_err(),
                "{} is still openable",
                report.backing_path.display()
            );
        }
    }

    assert_eq!(common::open_descriptor_count(), baseline);
}
