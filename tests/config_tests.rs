//! The shipped sample configuration stays loadable
use review_harvester::domain::SeedKind;
use review_harvester::infrastructure::AppConfig;
use std::path::Path;

fn sample() -> AppConfig {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/review-harvester.toml");
    AppConfig::load(Some(&path)).expect("sample config loads")
}

#[test]
fn sample_config_resolves_profile_and_seeds() {
    let config = sample();
    config.validate().unwrap();

    assert_eq!(config.resolve_profile().unwrap().name, "mustapp");
    assert_eq!(config.output.batch_size, 100);
    assert_eq!(config.crawl.max_item_duration_secs, Some(600));

    let seeds: Vec<_> = config
        .seeds
        .iter()
        .flat_map(|spec| spec.expand())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(seeds.len(), 200);
    assert_eq!(seeds[0].url(), "https://mustapp.com/p/1");
    assert!(seeds.iter().all(|seed| seed.kind() == SeedKind::Item));
}
