mod common;

use fake::{Fake, Faker};
use queue_batcher::{error::OfferError, types::Message, BatchAccumulator, FlushResult};

use crate::common::{message_of, sizes, RecordingSender};

#[tokio::test]
async fn offer_all_preserves_order_and_bounds() {
    for _ in 0..50 {
        let max_batch_size: u64 = (1..2000).fake();
        let count: usize = (0..200).fake();
        let messages: Vec<Message> = (0..count)
            .map(|_| message_of((0..=max_batch_size as usize).fake()))
            .collect();

        let sender = RecordingSender::new();
        let mut accumulator = BatchAccumulator::new(&sender, max_batch_size);
        let outcome = accumulator.offer_all(messages.clone()).await.unwrap();

        assert!(outcome.failures.is_empty());
        assert_eq!(0, accumulator.pending_len());

        let batches = sender.batches().await;
        assert_eq!(batches.len(), outcome.sent.len());
        for batch in &batches {
            assert!(!batch.is_empty());
            assert!(batch.iter().map(Message::size).sum::<u64>() <= max_batch_size);
        }
        assert_eq!(messages, sender.sent_messages().await);
    }
}

#[tokio::test]
async fn offer_all_keeps_messages_with_properties_in_order() {
    let messages: Vec<Message> = (0..20)
        .map(|i| {
            let tag: String = Faker.fake();
            Message::builder()
                .body(format!("message{}", i))
                .property("tag", tag)
                .build()
        })
        .collect();

    let sender = RecordingSender::new();
    let mut accumulator = BatchAccumulator::new(&sender, 4096);
    accumulator.offer_all(messages.clone()).await.unwrap();

    assert_eq!(messages, sender.sent_messages().await);
}

#[tokio::test]
async fn offer_all_splits_into_batches() {
    let sender = RecordingSender::new();
    let mut accumulator = BatchAccumulator::new(&sender, 1000);

    let outcome = accumulator
        .offer_all(vec![message_of(400), message_of(400), message_of(400)])
        .await
        .unwrap();

    assert_eq!(
        vec![
            FlushResult::Sent {
                count: 2,
                bytes: 800
            },
            FlushResult::Sent {
                count: 1,
                bytes: 400
            }
        ],
        outcome.sent
    );
}

#[tokio::test]
async fn offer_all_skips_oversized_messages() {
    let sender = RecordingSender::new();
    let mut accumulator = BatchAccumulator::new(&sender, 100);

    let outcome = accumulator
        .offer_all(vec![
            message_of(60),
            message_of(150),
            message_of(60),
            message_of(101),
        ])
        .await
        .unwrap();

    let rejected: Vec<u64> = outcome
        .failures
        .iter()
        .map(|err| match err {
            OfferError::MessageTooLarge { size, .. } => *size,
        })
        .collect();
    assert_eq!(vec![150, 101], rejected);
    assert_eq!(2, outcome.sent.len());
    assert_eq!(vec![60, 60], sizes(&sender.sent_messages().await));
}

#[tokio::test]
async fn offer_all_with_nothing_sends_nothing() {
    let sender = RecordingSender::new();
    let mut accumulator = BatchAccumulator::new(&sender, 100);

    let outcome = accumulator.offer_all(Vec::new()).await.unwrap();

    assert!(outcome.sent.is_empty());
    assert!(outcome.failures.is_empty());
    assert!(sender.batches().await.is_empty());
}

#[tokio::test]
async fn offer_all_stops_on_send_failure_without_losing_messages() {
    let sender = RecordingSender::new();
    let mut accumulator = BatchAccumulator::new(&sender, 100);
    sender.fail_next(1);

    let err = accumulator
        .offer_all(vec![
            message_of(50),
            message_of(50),
            message_of(50),
            message_of(10),
        ])
        .await
        .unwrap_err();

    assert!(err.sent.is_empty());
    assert_eq!(vec![50, 10], sizes(&err.unsent));
    // the batch that failed is still pending
    assert_eq!(2, accumulator.pending_len());
    assert!(sender.batches().await.is_empty());

    assert!(matches!(
        accumulator.flush().await.unwrap(),
        FlushResult::Sent { count: 2, .. }
    ));
    let outcome = accumulator.offer_all(err.unsent).await.unwrap();
    assert_eq!(1, outcome.sent.len());
    assert_eq!(vec![50, 50, 50, 10], sizes(&sender.sent_messages().await));
}

#[tokio::test]
async fn offer_all_reports_failed_final_flush() {
    let sender = RecordingSender::new();
    let mut accumulator = BatchAccumulator::new(&sender, 100);
    sender.fail_next(1);

    let err = accumulator
        .offer_all(vec![message_of(10), message_of(20)])
        .await
        .unwrap_err();

    assert!(err.unsent.is_empty());
    assert_eq!(30, accumulator.pending_size());
}
