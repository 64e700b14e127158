use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use pdfbinder::dispatch::{Dispatcher, spawn_session_reaper};
use pdfbinder::session::{ConversationId, replies};
use pdfbinder::transport::{Command, EventKind, InboundEvent};

use super::session_harness::{Harness, photo, png};

fn image(conv: ConversationId, shade: u8) -> InboundEvent {
    InboundEvent::new(conv, EventKind::Attachment(photo(png(shade))))
}

fn command(conv: ConversationId, command: Command) -> InboundEvent {
    InboundEvent::new(conv, EventKind::Command(command))
}

async fn run_to_completion(h: &Harness, events: Vec<InboundEvent>) {
    let (tx, rx) = mpsc::channel(16);
    let dispatcher = Dispatcher::new(Arc::clone(&h.service), Duration::from_secs(60));
    let running = tokio::spawn(dispatcher.run(rx));
    for event in events {
        tx.send(event).await.unwrap();
    }
    drop(tx);
    tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn interleaved_conversations_through_dispatcher() {
    let h = Harness::new();
    let a = ConversationId::new(42);
    let c = ConversationId::new(9);

    run_to_completion(
        &h,
        vec![
            command(a, Command::Start),
            image(a, 1),
            image(c, 2),
            image(a, 3),
            image(c, 4),
            image(a, 5),
            command(c, Command::Cancel),
            command(a, Command::Generate),
            command(c, Command::Generate),
        ],
    )
    .await;

    assert_eq!(
        h.channel.texts(a),
        vec![replies::WELCOME, replies::FIRST_IMAGE]
    );
    assert_eq!(
        h.channel.edits(a).last().map(String::as_str),
        Some("📚 Total images: 3\nSend more or /generate")
    );
    let documents = h.channel.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].conversation, a);

    assert_eq!(
        h.channel.texts(c),
        vec![
            replies::FIRST_IMAGE,
            replies::CLEARED,
            replies::NOTHING_TO_GENERATE
        ]
    );

    assert!(h.registry.is_empty());
    assert!(h.stored_files(a).await.is_empty());
    assert!(h.stored_files(c).await.is_empty());
}

#[tokio::test]
async fn failures_become_replies_and_keep_the_session() {
    let h = Harness::new();
    let conv = ConversationId::new(11);
    h.channel.set_fail_documents(true);

    run_to_completion(
        &h,
        vec![
            image(conv, 1),
            command(conv, Command::Generate),
            command(conv, Command::Help),
        ],
    )
    .await;

    assert_eq!(
        h.channel.texts(conv),
        vec![
            replies::FIRST_IMAGE,
            replies::DELIVERY_FAILED,
            replies::HELP
        ]
    );
    assert_eq!(h.registry.get(conv).unwrap().image_count(), 1);
}

#[tokio::test]
async fn rejected_image_reply_comes_from_dispatcher() {
    let h = Harness::new();
    let conv = ConversationId::new(12);

    run_to_completion(
        &h,
        vec![InboundEvent::new(
            conv,
            EventKind::Attachment(super::session_harness::document(
                b"%PDF-1.7".to_vec(),
                "application/pdf",
            )),
        )],
    )
    .await;

    assert_eq!(h.channel.texts(conv), vec![replies::SEND_AN_IMAGE]);
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn idle_sessions_expire_through_the_dispatcher() {
    let h = Harness::with_idle_ttl(Duration::from_millis(50));
    let conv = ConversationId::new(13);
    h.service.ingest(conv, &photo(png(1))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (tx, rx) = mpsc::channel(16);
    let reaper = spawn_session_reaper(
        Arc::clone(&h.registry),
        Duration::from_millis(50),
        Duration::from_secs(1),
        tx,
    );
    let running = tokio::spawn(
        Dispatcher::new(Arc::clone(&h.service), Duration::from_secs(60)).run(rx),
    );

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while h.registry.get(conv).is_some() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    reaper.abort();
    tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .unwrap()
        .unwrap();

    assert!(h.registry.get(conv).is_none());
    assert!(h.stored_files(conv).await.is_empty());
    assert_eq!(h.channel.last_text(conv).as_deref(), Some(replies::EXPIRED));
}
