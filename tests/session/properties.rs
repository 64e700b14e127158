use std::sync::Arc;

use pdfbinder::error::{AssemblyError, IngestError, StorageError};
use pdfbinder::media::ImagePdfRenderer;
use pdfbinder::session::{CancelOutcome, ConversationId, SessionService};
use pdfbinder::storage::BlobStore;
use pdfbinder::transport::Channel;

use super::session_harness::{Harness, MIB, document, photo, photo_declared, png};

#[tokio::test]
async fn images_keep_arrival_order() {
    let h = Harness::new();
    let conv = ConversationId::new(1);
    let inputs: Vec<Vec<u8>> = (0..8).map(|i| png(i * 30)).collect();

    for (i, bytes) in inputs.iter().enumerate() {
        let count = h.service.ingest(conv, &photo(bytes.clone())).await.unwrap();
        assert_eq!(count, i + 1);
    }

    assert_eq!(h.session_contents(conv).await, inputs);
}

#[tokio::test]
async fn exact_size_limit_is_accepted() {
    let h = Harness::new();
    let conv = ConversationId::new(2);
    let at_limit = vec![0xAB; usize::try_from(5 * MIB).unwrap()];

    assert_eq!(h.service.ingest(conv, &photo(at_limit)).await.unwrap(), 1);
}

#[tokio::test]
async fn one_byte_over_the_limit_changes_nothing() {
    let h = Harness::new();
    let conv = ConversationId::new(2);
    let over = vec![0xAB; usize::try_from(5 * MIB + 1).unwrap()];

    let declared = h.service.ingest(conv, &photo(over.clone())).await;
    assert!(matches!(
        declared,
        Err(IngestError::TooLarge { size, limit }) if size == 5 * MIB + 1 && limit == 5 * MIB
    ));

    let undeclared = h.service.ingest(conv, &photo_declared(over, None)).await;
    assert!(matches!(undeclared, Err(IngestError::TooLarge { .. })));

    assert!(h.registry.get(conv).is_none());
    assert!(h.stored_files(conv).await.is_empty());
}

#[tokio::test]
async fn non_image_documents_are_rejected_before_any_io() {
    let h = Harness::new();
    let conv = ConversationId::new(3);

    let err = h
        .service
        .ingest(conv, &document(b"PK\x03\x04".to_vec(), "application/zip"))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::NotAnImage));
    assert!(h.registry.is_empty());
    assert!(!h.store.root().join("3").exists());

    h.service
        .ingest(conv, &document(png(5), "image/png"))
        .await
        .unwrap();
    assert_eq!(h.registry.get(conv).unwrap().image_count(), 1);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let h = Harness::new();
    let conv = ConversationId::new(4);

    assert_eq!(h.service.cancel(conv).await, CancelOutcome::NothingToClear);

    h.service.ingest(conv, &photo(png(1))).await.unwrap();
    assert_eq!(
        h.service.cancel(conv).await,
        CancelOutcome::Cleared { images: 1 }
    );
    assert_eq!(h.service.cancel(conv).await, CancelOutcome::NothingToClear);
    assert!(h.registry.get(conv).is_none());
    assert!(h.stored_files(conv).await.is_empty());
}

#[tokio::test]
async fn staging_failure_leaves_no_session_and_no_reply() {
    let h = Harness::new();
    let conv = ConversationId::new(77);
    let root = h.dir.path().join("temp");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("77"), b"in the way").unwrap();

    let err = h.service.ingest(conv, &photo(png(1))).await.unwrap_err();

    assert!(matches!(
        err,
        IngestError::Staging(StorageError::Io {
            op: "create_dir_all",
            ..
        })
    ));
    assert_eq!(err.user_message(), "⚠️ Failed to process image");
    assert!(h.registry.get(conv).is_none());
    assert!(h.registry.is_empty());
    assert!(h.channel.texts(conv).is_empty());
    assert!(root.join("77").is_file());
}

#[tokio::test]
async fn missing_staged_image_keeps_session_for_retry() {
    let h = Harness::new();
    let conv = ConversationId::new(78);
    h.service.ingest(conv, &photo(png(1))).await.unwrap();
    h.service.ingest(conv, &photo(png(2))).await.unwrap();
    let lost = h.registry.get(conv).unwrap().images()[1].clone();
    std::fs::remove_file(lost.path()).unwrap();

    let err = h.service.generate(conv).await.unwrap_err();

    assert!(matches!(err, AssemblyError::Load(_)));
    assert_eq!(err.user_message(), "Failed to create PDF. Please try again.");
    let session = h.registry.get(conv).unwrap();
    assert_eq!(session.image_count(), 2);
    assert!(session.rendered.is_none());
    assert_eq!(h.stored_files(conv).await.len(), 1);
    assert!(h.channel.documents().is_empty());
}

#[tokio::test]
async fn unstageable_document_keeps_session_for_retry() {
    let h = Harness::new();
    let conv = ConversationId::new(79);
    h.service.ingest(conv, &photo(png(1))).await.unwrap();
    let service = SessionService::new(
        Arc::clone(&h.registry),
        Arc::clone(&h.store) as Arc<dyn BlobStore>,
        Arc::new(ImagePdfRenderer::new()),
        Arc::clone(&h.channel) as Arc<dyn Channel>,
    )
    .with_document_name("../outside.pdf");

    let err = service.generate(conv).await.unwrap_err();

    assert!(matches!(
        err,
        AssemblyError::Staging(StorageError::InvalidName(_))
    ));
    let session = h.registry.get(conv).unwrap();
    assert_eq!(session.image_count(), 1);
    assert!(session.rendered.is_none());
    assert_eq!(h.stored_files(conv).await.len(), 1);
    assert!(h.channel.documents().is_empty());

    assert_eq!(h.service.generate(conv).await.unwrap(), 1);
    assert!(h.registry.get(conv).is_none());
}

#[tokio::test]
async fn conversion_failure_keeps_session_for_retry() {
    let h = Harness::new();
    let conv = ConversationId::new(5);
    h.service.ingest(conv, &photo(png(1))).await.unwrap();
    h.service
        .ingest(conv, &photo(b"definitely not an image".to_vec()))
        .await
        .unwrap();
    let before = h.session_contents(conv).await;

    let err = h.service.generate(conv).await.unwrap_err();

    assert!(matches!(err, AssemblyError::Conversion(_)));
    assert_eq!(err.user_message(), "Failed to create PDF. Please try again.");
    assert_eq!(h.session_contents(conv).await, before);
    assert_eq!(h.stored_files(conv).await.len(), 2);
    assert!(h.channel.documents().is_empty());

    // Still retryable: a second attempt fails the same way rather than
    // reporting an empty session.
    assert!(matches!(
        h.service.generate(conv).await,
        Err(AssemblyError::Conversion(_))
    ));
}

#[tokio::test]
async fn delivery_failure_preserves_images_and_document() {
    let h = Harness::new();
    let conv = ConversationId::new(6);
    h.service.ingest(conv, &photo(png(1))).await.unwrap();
    h.service.ingest(conv, &photo(png(2))).await.unwrap();
    h.channel.set_fail_documents(true);

    let err = h.service.generate(conv).await.unwrap_err();

    assert!(matches!(err, AssemblyError::Delivery(_)));
    let session = h.registry.get(conv).unwrap();
    assert_eq!(session.image_count(), 2);
    let rendered = session.rendered.as_ref().unwrap();
    assert_eq!(rendered.page_count, 2);
    assert!(rendered.file.path().exists());

    h.channel.set_fail_documents(false);
    assert_eq!(h.service.generate(conv).await.unwrap(), 2);
    assert!(h.registry.get(conv).is_none());
    assert!(h.stored_files(conv).await.is_empty());
}

#[tokio::test]
async fn successful_generate_leaves_no_files() {
    let h = Harness::new();
    let conv = ConversationId::new(7);
    for shade in 0..4 {
        h.service.ingest(conv, &photo(png(shade))).await.unwrap();
    }

    h.service.generate(conv).await.unwrap();

    assert!(h.stored_files(conv).await.is_empty());
    assert!(h.registry.is_empty());
}

#[tokio::test]
async fn concurrent_conversations_stay_isolated() {
    let h = Harness::new();
    let a = ConversationId::new(100);
    let b = ConversationId::new(200);

    let ingest_all = |conv: ConversationId, base: u8| {
        let service = Arc::clone(&h.service);
        tokio::spawn(async move {
            for i in 0..10 {
                service.ingest(conv, &photo(png(base + i))).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };
    let (ra, rb) = tokio::join!(ingest_all(a, 0), ingest_all(b, 100));
    ra.unwrap();
    rb.unwrap();

    for (conv, base) in [(a, 0_u8), (b, 100_u8)] {
        let session = h.registry.get(conv).unwrap();
        assert_eq!(session.image_count(), 10);
        assert!(session.images().iter().all(|f| f.conversation() == conv));
        assert!(
            session
                .images()
                .iter()
                .all(|f| f.path().parent().unwrap().ends_with(conv.to_string()))
        );
        let expected: Vec<_> = (0..10).map(|i| png(base + i)).collect();
        assert_eq!(h.session_contents(conv).await, expected);
    }
}

#[tokio::test]
async fn failed_status_edit_falls_back_to_new_message() {
    let h = Harness::new();
    let conv = ConversationId::new(8);
    h.service.ingest(conv, &photo(png(1))).await.unwrap();
    h.channel.set_fail_edits(true);

    h.service.ingest(conv, &photo(png(2))).await.unwrap();
    h.channel.set_fail_edits(false);
    h.service.ingest(conv, &photo(png(3))).await.unwrap();

    assert_eq!(
        h.channel.texts(conv),
        vec![
            "✅ First image received! Send more or /generate".to_string(),
            "📚 Total images: 2\nSend more or /generate".to_string(),
        ]
    );
    let status = h.registry.get(conv).unwrap().status_message.unwrap();
    assert_eq!(status.message_id, 2);
    assert_eq!(
        h.channel.edits(conv),
        vec!["📚 Total images: 3\nSend more or /generate".to_string()]
    );
}
