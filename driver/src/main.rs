use std::path::PathBuf;

use clap::Parser;
use queue_batcher::{
    types::{ByteCapacity, Message, TransportType},
    error::OfferError,
    BatchAccumulator, Environment, FlushResult, FrameSender, OfferResult, Sender, TracingSender,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Upper bound on the messages offered while filling the demo batch
const MAX_FILL_MESSAGES: usize = 1000;
/// Largest payload built to show an oversized message being rejected
const MAX_OVERSIZED_LEN: u64 = 4 * 1000 * 1000;

#[derive(Parser, Debug)]
#[clap(version = "0.1", about = "Sends a single message and a full batch to a queue")]
struct Opts {
    #[clap(long, env = "SERVICE_BUS_CONNECTION_STR", hide_env_values = true)]
    connection_string: String,

    #[clap(long, env = "SERVICE_BUS_QUEUE_NAME")]
    queue_name: String,

    #[clap(long, env = "SERVICE_BUS_MAX_BATCH_SIZE", default_value = "256KB")]
    max_batch_size: ByteCapacity,

    #[clap(long, default_value = "amqp-over-websocket")]
    transport: TransportType,

    /// Proxy the transport should tunnel through, if any
    #[clap(long, env = "SERVICE_BUS_HTTP_PROXY")]
    http_proxy: Option<String>,

    /// Write batches as frames to this file instead of only logging them
    #[clap(short, long)]
    output: Option<PathBuf>,

    #[clap(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();

    let environment = Environment::builder()
        .connection_string(&opts.connection_string)
        .queue_name(&opts.queue_name)
        .max_batch_size(opts.max_batch_size)
        .transport(opts.transport)
        .http_proxy(opts.http_proxy.clone())
        .logging(opts.verbose)
        .build()?;

    let level = if environment.logging_enabled() {
        Level::TRACE
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!(
        transport = %environment.transport(),
        queue = environment.queue_name(),
        http_proxy = ?environment.http_proxy(),
        "starting"
    );

    match &opts.output {
        Some(path) => {
            let file = tokio::fs::File::create(path).await?;
            let sender = FrameSender::new(environment.queue_name(), file);
            run(&environment, &sender).await?;
            sender.close().await?;
        }
        None => {
            let sender = TracingSender::new(environment.queue_name());
            run(&environment, &sender).await?;
        }
    }

    println!("Send message is done.");
    Ok(())
}

async fn run<S: Sender>(
    environment: &Environment,
    sender: &S,
) -> Result<(), Box<dyn std::error::Error>> {
    send_single_message(sender).await?;

    let mut accumulator = environment.accumulator(sender);
    send_batch_message(&mut accumulator).await?;
    send_stream(&mut accumulator).await?;
    Ok(())
}

async fn send_single_message<S: Sender>(sender: &S) -> Result<(), Box<dyn std::error::Error>> {
    let message = Message::new("DATA".repeat(64));
    sender.send_message(&message).await?;
    Ok(())
}

/// Fills one batch until it reports full and sends it. The overflowing message is
/// dropped, this only demonstrates filling a single batch.
///
/// Returns `None` when the ceiling is too small for a single demo message.
async fn send_batch_message<S: Sender>(
    accumulator: &mut BatchAccumulator<S>,
) -> Result<Option<FlushResult>, Box<dyn std::error::Error>> {
    for _ in 0..MAX_FILL_MESSAGES {
        match accumulator.offer(Message::new("DATA".repeat(256))) {
            Ok(OfferResult::Added) => {}
            Ok(OfferResult::BatchFull(_)) => break,
            Err(OfferError::MessageTooLarge { size, max_size, .. }) => {
                warn!(size, max_size, "batch size too small for the demo batch, skipping");
                return Ok(None);
            }
        }
    }
    let result = accumulator.flush().await?;
    info!(?result, "batch flushed");
    Ok(Some(result))
}

/// Length of a payload one byte over the ceiling, when it is reasonable to build
fn oversized_len(max_batch_size: u64) -> Option<usize> {
    max_batch_size
        .checked_add(1)
        .filter(|len| *len <= MAX_OVERSIZED_LEN)
        .and_then(|len| usize::try_from(len).ok())
}

/// Streams a mix of regular and oversized messages through the accumulator.
async fn send_stream<S: Sender>(
    accumulator: &mut BatchAccumulator<S>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let oversized =
        oversized_len(accumulator.max_batch_size()).map(|len| Message::new(vec![0u8; len]));
    let messages = (0..100)
        .map(|i| {
            Message::builder()
                .body(format!("message{}", i))
                .property("sequence", i.to_string())
                .build()
        })
        .chain(oversized);

    let outcome = accumulator.offer_all(messages).await?;
    for failure in &outcome.failures {
        warn!(error = %failure, "message not sent");
    }
    info!(
        batches = outcome.sent.len(),
        rejected = outcome.failures.len(),
        "stream sent"
    );
    Ok(outcome.failures.len())
}
