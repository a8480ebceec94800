mod common;

use biotope_lib::app::{
    EcosystemHandle, EcosystemLogic, ParamUpdate, Pipeline, PipelineOptions, TracingRenderSink,
};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pipeline_runs_to_tick_limit() {
    let config = common::fast_pipeline_config(60);
    let pipeline = Pipeline::new(
        config,
        PipelineOptions {
            max_ticks: Some(20),
            seed: 7,
        },
    );

    let report = tokio::time::timeout(Duration::from_secs(10), pipeline.run())
        .await
        .expect("pipeline finished in time")
        .expect("pipeline succeeded");

    assert_eq!(report.ecosystem_ticks, 20);
    assert!(report.force_ticks >= 1);
    assert!(report.registry_consistent);
    assert_eq!(
        report.final_agents as u64,
        report.churn.adds - report.churn.removes
    );
    assert!(report.final_agents <= 120);
    assert!(report.forces.samples >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_signal_stops_unbounded_run() {
    let config = common::fast_pipeline_config(10);
    let pipeline = Pipeline::new(config, PipelineOptions::default());
    let shutdown = pipeline.shutdown_signal();

    let run = tokio::spawn(pipeline.run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.request_shutdown();

    let report = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("pipeline stopped in time")
        .expect("pipeline task joined")
        .expect("pipeline succeeded");
    assert!(report.ecosystem_ticks >= 1);
    assert!(report.registry_consistent);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_param_updates_are_applied_or_rejected() {
    let config = common::fast_pipeline_config(20);
    let pipeline = Pipeline::new(
        config,
        PipelineOptions {
            max_ticks: Some(10),
            seed: 1,
        },
    );
    let params = pipeline.param_sender();
    params.send(ParamUpdate::new("max_force", 50.0)).unwrap();
    params.send(ParamUpdate::new("warp_factor", 9.0)).unwrap();
    drop(params);

    let report = tokio::time::timeout(Duration::from_secs(10), pipeline.run())
        .await
        .expect("pipeline finished in time")
        .expect("pipeline succeeded");

    assert_eq!(report.params_applied, 1);
    assert_eq!(report.params_rejected, 1);
}

/// Births only, so every structural change must reach physics as an event.
struct BirthsOnly;

impl EcosystemLogic for BirthsOnly {
    fn seed(&mut self, handle: &mut EcosystemHandle<'_>) {
        let s = common::species(5);
        for i in 0..5 {
            handle.add_agent(s, biotope_data::Vec2::new(1000.0 + i as f32, 1000.0), biotope_data::Vec2::ZERO);
        }
    }

    fn step(&mut self, handle: &mut EcosystemHandle<'_>, tick: u64) {
        let s = common::species((tick % 8) as u8 + 1);
        handle.add_agent(s, biotope_data::Vec2::new(900.0, 900.0 + tick as f32), biotope_data::Vec2::ZERO);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_custom_logic_and_sink() {
    let config = common::fast_pipeline_config(5);
    let pipeline = Pipeline::new(
        config,
        PipelineOptions {
            max_ticks: Some(5),
            seed: 0,
        },
    )
    .with_logic(BirthsOnly)
    .with_render(TracingRenderSink::new());

    let report = tokio::time::timeout(Duration::from_secs(10), pipeline.run())
        .await
        .expect("pipeline finished in time")
        .expect("pipeline succeeded");

    assert_eq!(report.final_agents, 10);
    assert_eq!(report.structure_version, 10);
    assert_eq!(report.churn.removes, 0);
}
