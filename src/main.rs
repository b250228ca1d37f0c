use anyhow::Result;
use clap::{Arg, Command};
use log::info;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use streamfx::capture::{self, InterceptedAcquirer, SyntheticAcquirer};
use streamfx::{EffectsConfig, EffectsContext, StreamConstraints};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let matches = Command::new("streamfx")
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("level")
                .short('l')
                .long("level")
                .value_name("LEVEL")
                .help("Noise suppression level in [0, 1]; out-of-range values are clamped.")
                .default_value("0.7"),
        )
        .arg(
            Arg::new("seconds")
                .short('s')
                .long("seconds")
                .value_name("SECONDS")
                .help("How long to run the pipeline.")
                .default_value("5"),
        )
        .get_matches();

    let level: f32 = matches.get_one::<String>("level").unwrap().parse()?;
    let seconds: u64 = matches.get_one::<String>("seconds").unwrap().parse()?;

    // gracefully close on SIGINT
    ctrlc::set_handler(move || {
        process::exit(130);
    })?;

    let context = Arc::new(EffectsContext::new(EffectsConfig::default()));
    let manager = context.initialize().await?;

    capture::install(Arc::new(InterceptedAcquirer::wrap(
        Arc::new(SyntheticAcquirer::default()),
        context.clone(),
    )));

    manager.set_noise_suppression(level).await;
    info!(
        "noise suppression enabled at {}",
        manager.noise_suppression_level().await
    );

    let stream = capture::acquire(StreamConstraints::both()).await?;
    info!("acquired {:?}", stream);

    let audio_track = stream
        .audio_track()
        .expect("processed stream carries an audio track")
        .clone();
    let video_track = stream
        .video_track()
        .expect("processed stream carries a video track")
        .clone();

    let mut audio_rx = audio_track.subscribe_audio().unwrap();
    let audio_counter = tokio::spawn(async move {
        let mut blocks: u64 = 0;
        loop {
            tokio::select! {
                _ = audio_track.ended() => break,
                received = audio_rx.recv() => match received {
                    Ok(_) => blocks += 1,
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        }
        blocks
    });

    let mut video_rx = video_track.subscribe_video().unwrap();
    let video_counter = tokio::spawn(async move {
        let mut frames: u64 = 0;
        loop {
            tokio::select! {
                _ = video_track.ended() => break,
                received = video_rx.recv() => match received {
                    Ok(_) => frames += 1,
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        }
        frames
    });

    // Halve the level mid-run to show the live update path.
    tokio::time::sleep(Duration::from_secs(seconds / 2)).await;
    manager.set_noise_suppression(level * 0.5).await;
    info!(
        "suppression level changed live to {}",
        manager.noise_suppression_level().await
    );
    tokio::time::sleep(Duration::from_secs(seconds - seconds / 2)).await;

    manager.close().await;
    drop(stream);

    let blocks = audio_counter.await?;
    let frames = video_counter.await?;
    info!("processed {blocks} audio blocks and {frames} video frames in {seconds}s");

    Ok(())
}
