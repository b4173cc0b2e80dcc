use rating_core::model::{
    Answer, Assignment, AssignmentId, ImageDraft, ImageId, Question, QuestionDraft, QuestionId,
    QuestionKind, RatingId, Session, SessionId, SessionKind, SubjectDraft, SubjectId,
    plan_assignments,
};
use rating_core::time::fixed_now;
use storage::repository::{
    AssignmentRepository, ImageRepository, QuestionRepository, RatingBatch, RatingRepository,
    SessionRepository, StorageError, SubjectRepository,
};
use storage::sqlite::SqliteRepository;
use tempfile::TempDir;

async fn open_repo() -> (TempDir, SqliteRepository) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("ratings.sqlite3").display()
    );
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    (dir, repo)
}

async fn likert_question(repo: &SqliteRepository, text: &str) -> Question {
    repo.insert_question(
        QuestionDraft {
            text: text.into(),
            kind: QuestionKind::Likert,
            min_scale: Some(1),
            max_scale: Some(5),
            step: None,
        }
        .validate(fixed_now())
        .unwrap(),
    )
    .await
    .unwrap()
}

/// Subject, three images and a real session with all three assigned.
async fn seeded(repo: &SqliteRepository) -> (Session, Vec<Assignment>) {
    let subject = repo
        .insert_subject(
            SubjectDraft {
                name: "P1".into(),
                age: Some(30),
                gender: Some("f".into()),
            }
            .validate(fixed_now())
            .unwrap(),
        )
        .await
        .unwrap();

    let mut image_ids = Vec::new();
    for n in 1..=3 {
        let image = repo
            .insert_image(
                ImageDraft {
                    file_name: format!("{n}.jpg"),
                    file_path: Some(format!("images/{n}.jpg")),
                    description: None,
                }
                .validate(fixed_now())
                .unwrap(),
            )
            .await
            .unwrap();
        image_ids.push(image.id);
    }

    let session = repo
        .insert_session(subject.id, SessionKind::Real, fixed_now())
        .await
        .unwrap();
    let plan = plan_assignments(&session, &image_ids).unwrap();
    let assignments = repo.insert_assignments(session.id(), plan).await.unwrap();
    (session, assignments)
}

fn answer(question_id: QuestionId, value: f64) -> Answer {
    Answer {
        question_id,
        value: Some(value),
        text: None,
        response_time: Some(2.5),
    }
}

#[tokio::test]
async fn sqlite_roundtrips_catalog_and_sessions() {
    let (_dir, repo) = open_repo().await;
    let (session, assignments) = seeded(&repo).await;
    let question = likert_question(&repo, "Overall quality").await;

    let fetched = repo.get_session(session.id()).await.unwrap().unwrap();
    assert_eq!(fetched, session);
    assert_eq!(fetched.last_seen_position(), 0);

    let q = repo.get_question(question.id).await.unwrap().unwrap();
    assert_eq!(q.scale.map(|s| (s.min(), s.max(), s.step())), Some((1, 5, 1)));

    let listed = repo.assignments_for_session(session.id()).await.unwrap();
    let order: Vec<u32> = listed.iter().map(|a| a.assignment.position.value()).collect();
    assert_eq!(order, vec![1, 2, 3]);
    assert_eq!(listed[0].image.file_name, "1.jpg");
    assert_eq!(listed[0].assignment, assignments[0]);

    let page = repo.list_images(1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].file_name, "2.jpg");

    let existing = repo
        .existing_image_ids(&[ImageId::new(3), ImageId::new(99), ImageId::new(1)])
        .await
        .unwrap();
    assert_eq!(existing, vec![ImageId::new(1), ImageId::new(3)]);
}

#[tokio::test]
async fn session_for_missing_subject_is_not_found() {
    let (_dir, repo) = open_repo().await;
    let err = repo
        .insert_session(SubjectId::new(404), SessionKind::Training, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn next_after_skips_answered_positions() {
    let (_dir, repo) = open_repo().await;
    let (session, assignments) = seeded(&repo).await;

    let first = repo.next_after(session.id(), 0).await.unwrap().unwrap();
    assert_eq!(first.assignment.id, assignments[0].id);
    let third = repo.next_after(session.id(), 2).await.unwrap().unwrap();
    assert_eq!(third.assignment.id, assignments[2].id);
    assert!(repo.next_after(session.id(), 3).await.unwrap().is_none());
}

#[tokio::test]
async fn second_assignment_set_conflicts() {
    let (_dir, repo) = open_repo().await;
    let (session, _) = seeded(&repo).await;
    let plan = plan_assignments(&session, &[ImageId::new(1)]).unwrap();
    let err = repo
        .insert_assignments(session.id(), plan)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn record_answers_advances_and_rejects_duplicates_atomically() {
    let (_dir, repo) = open_repo().await;
    let (session, assignments) = seeded(&repo).await;
    let q1 = likert_question(&repo, "Sharpness").await;
    let q2 = likert_question(&repo, "Noise").await;

    let outcome = repo
        .record_answers(RatingBatch::new(
            &session,
            &assignments[1],
            vec![answer(q1.id, 4.0)],
            fixed_now(),
        ))
        .await
        .unwrap();
    assert!(outcome.advanced);
    assert_eq!(outcome.last_seen_position, 2);

    // q2 is new but q1 collides, so neither is written.
    let err = repo
        .record_answers(RatingBatch::new(
            &session,
            &assignments[1],
            vec![answer(q2.id, 3.0), answer(q1.id, 5.0)],
            fixed_now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
    assert!(!repo.rating_exists(assignments[1].id, q2.id).await.unwrap());

    let stored = repo.ratings_for_assignment(assignments[1].id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].value, Some(4.0));
    assert_eq!(stored[0].response_time, Some(2.5));
    assert_eq!(stored[0].position.value(), 2);

    let fetched = repo.get_rating(outcome.rating_ids[0]).await.unwrap().unwrap();
    assert_eq!(fetched, stored[0]);
}

#[tokio::test]
async fn earlier_position_leaves_cursor_alone() {
    let (_dir, repo) = open_repo().await;
    let (session, assignments) = seeded(&repo).await;
    let q = likert_question(&repo, "Quality").await;

    repo.record_answers(RatingBatch::new(
        &session,
        &assignments[2],
        vec![answer(q.id, 2.0)],
        fixed_now(),
    ))
    .await
    .unwrap();
    let outcome = repo
        .record_answers(RatingBatch::new(
            &session,
            &assignments[0],
            vec![answer(q.id, 2.0)],
            fixed_now(),
        ))
        .await
        .unwrap();

    assert!(!outcome.advanced);
    assert_eq!(outcome.last_seen_position, 3);
    assert!(!repo.advance_if_greater(session.id(), 1).await.unwrap());
}

#[tokio::test]
async fn mark_complete_fires_once() {
    let (_dir, repo) = open_repo().await;
    let (session, _) = seeded(&repo).await;

    assert!(repo.mark_complete(session.id(), fixed_now()).await.unwrap());
    assert!(!repo.mark_complete(session.id(), fixed_now()).await.unwrap());

    let stored = repo.get_session(session.id()).await.unwrap().unwrap();
    assert!(stored.is_completed());
    assert_eq!(stored.ended_at(), Some(fixed_now()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_duplicate_submissions_store_one_rating() {
    let (_dir, repo) = open_repo().await;
    let (session, assignments) = seeded(&repo).await;
    let q = likert_question(&repo, "Quality").await;

    let batch = RatingBatch::new(
        &session,
        &assignments[0],
        vec![answer(q.id, 5.0)],
        fixed_now(),
    );
    let a = tokio::spawn({
        let repo = repo.clone();
        let batch = batch.clone();
        async move { repo.record_answers(batch).await }
    });
    let b = tokio::spawn({
        let repo = repo.clone();
        async move { repo.record_answers(batch).await }
    });
    let results = [a.await.unwrap(), b.await.unwrap()];

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(StorageError::Conflict)))
        .count();
    assert_eq!((ok, conflicts), (1, 1));
    assert_eq!(
        repo.ratings_for_assignment(assignments[0].id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn completed_session_rejects_stale_batch() {
    let (_dir, repo) = open_repo().await;
    let (session, assignments) = seeded(&repo).await;
    let q = likert_question(&repo, "Quality").await;

    assert!(repo.mark_complete(session.id(), fixed_now()).await.unwrap());
    let err = repo
        .record_answers(RatingBatch::new(
            &session,
            &assignments[2],
            vec![answer(q.id, 4.0)],
            fixed_now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::SessionCompleted));
    assert!(!repo.rating_exists(assignments[2].id, q.id).await.unwrap());

    let stored = repo.get_session(session.id()).await.unwrap().unwrap();
    assert_eq!(stored.last_seen_position(), 0);
    assert_eq!(stored.ended_at(), Some(fixed_now()));
}

#[tokio::test]
async fn ids_beyond_the_row_range_read_as_missing() {
    let (_dir, repo) = open_repo().await;
    let (session, _) = seeded(&repo).await;

    assert!(repo.get_session(SessionId::new(u64::MAX)).await.unwrap().is_none());
    assert!(repo.get_subject(SubjectId::new(u64::MAX)).await.unwrap().is_none());
    assert!(repo.get_image(ImageId::new(u64::MAX)).await.unwrap().is_none());
    assert!(repo.get_question(QuestionId::new(u64::MAX)).await.unwrap().is_none());
    assert!(
        repo.get_assignment(AssignmentId::new(u64::MAX))
            .await
            .unwrap()
            .is_none()
    );
    assert!(repo.get_rating(RatingId::new(u64::MAX)).await.unwrap().is_none());
    assert!(
        repo.next_after(SessionId::new(u64::MAX), 0)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        repo.assignments_for_session(SessionId::new(u64::MAX))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        repo.existing_image_ids(&[ImageId::new(u64::MAX), ImageId::new(1)])
            .await
            .unwrap(),
        vec![ImageId::new(1)]
    );
    assert!(
        !repo
            .rating_exists(AssignmentId::new(u64::MAX), QuestionId::new(1))
            .await
            .unwrap()
    );

    let err = repo
        .advance_if_greater(SessionId::new(u64::MAX), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert_eq!(
        repo.get_session(session.id())
            .await
            .unwrap()
            .unwrap()
            .last_seen_position(),
        0
    );
}
