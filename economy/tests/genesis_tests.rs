mod support;

use common::bus::NullSink;
use economy::error::EconomyError;
use economy::genesis::{
    GENESIS_ID, GENESIS_INITIAL_CREDITS, SPAWN_COST, create_root, spawn_child,
};
use economy::ledger;
use economy::store::agents;
use support::{add_agent, test_db};

#[tokio::test]
async fn create_root_is_idempotent() -> anyhow::Result<()> {
    let db = test_db().await?;
    let root_dir = tempfile::tempdir()?;

    let first = create_root(&db, root_dir.path()).await?;
    assert_eq!(first.id, GENESIS_ID);
    assert_eq!(first.balance, GENESIS_INITIAL_CREDITS);
    assert!(first.lineage.is_empty());
    assert!(root_dir.path().join(GENESIS_ID).is_dir());

    let second = create_root(&db, root_dir.path()).await?;
    assert_eq!(second.id, first.id);
    assert_eq!(second.balance, GENESIS_INITIAL_CREDITS);

    let mut conn = db.pool().acquire().await?;
    assert_eq!(agents::list_agents(&mut conn).await?.len(), 1);
    // Seeding is external minting: no ledger row is written for it.
    assert!(ledger::history(&mut conn, GENESIS_ID).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn spawn_conserves_credits_and_appends_two_transactions() -> anyhow::Result<()> {
    let db = test_db().await?;
    let root_dir = tempfile::tempdir()?;
    create_root(&db, root_dir.path()).await?;

    let child = spawn_child(&db, &NullSink, root_dir.path(), GENESIS_ID, 100.0, &[]).await?;

    let mut conn = db.pool().acquire().await?;
    let parent = agents::get_agent(&mut conn, GENESIS_ID).await?;
    assert_eq!(parent.balance, GENESIS_INITIAL_CREDITS - 100.0 - SPAWN_COST);
    assert_eq!(child.balance, 100.0);
    assert_eq!(child.lineage, vec![GENESIS_ID.to_string()]);

    let history = ledger::history(&mut conn, GENESIS_ID).await?;
    assert_eq!(history.len(), 2);
    let fee = history.iter().find(|t| t.memo == "spawn fee").unwrap();
    assert_eq!(fee.to_entity, ledger::SYSTEM);
    assert_eq!(fee.amount, SPAWN_COST);
    let grant = history.iter().find(|t| t.memo == "initial credits").unwrap();
    assert_eq!(grant.to_entity, child.id);
    assert_eq!(grant.amount, 100.0);

    // The child workspace exists and is registered.
    let workspace = agents::workspace_for_agent(&mut conn, &child.id)
        .await?
        .unwrap();
    assert!(std::path::Path::new(&workspace.filesystem_path).is_dir());
    Ok(())
}

#[tokio::test]
async fn lineage_is_parent_first() -> anyhow::Result<()> {
    let db = test_db().await?;
    let root_dir = tempfile::tempdir()?;
    create_root(&db, root_dir.path()).await?;

    let child = spawn_child(&db, &NullSink, root_dir.path(), GENESIS_ID, 200.0, &[]).await?;
    let grandchild = spawn_child(&db, &NullSink, root_dir.path(), &child.id, 50.0, &[]).await?;

    assert_eq!(
        grandchild.lineage,
        vec![child.id.clone(), GENESIS_ID.to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn spawn_without_funds_changes_nothing() -> anyhow::Result<()> {
    let db = test_db().await?;
    let root_dir = tempfile::tempdir()?;
    add_agent(&db, "poor", 50.0).await?;

    let err = spawn_child(&db, &NullSink, root_dir.path(), "poor", 100.0, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, EconomyError::InsufficientFunds { .. }));

    let mut conn = db.pool().acquire().await?;
    assert_eq!(ledger::balance(&mut conn, "poor").await?, 50.0);
    assert!(ledger::history(&mut conn, "poor").await?.is_empty());
    assert_eq!(agents::list_agents(&mut conn).await?.len(), 1);
    // No workspace directory was created either.
    assert_eq!(std::fs::read_dir(root_dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn spawn_seeds_payload_files() -> anyhow::Result<()> {
    let db = test_db().await?;
    let root_dir = tempfile::tempdir()?;
    create_root(&db, root_dir.path()).await?;

    let payload = vec![
        ("run.sh".to_string(), "echo hi".to_string()),
        ("".to_string(), "skipped".to_string()),
    ];
    let child = spawn_child(&db, &NullSink, root_dir.path(), GENESIS_ID, 10.0, &payload).await?;

    let mut conn = db.pool().acquire().await?;
    let workspace = agents::workspace_for_agent(&mut conn, &child.id)
        .await?
        .unwrap();
    let ws_path = std::path::PathBuf::from(&workspace.filesystem_path);

    assert_eq!(std::fs::read_to_string(ws_path.join("run.sh"))?, "echo hi");
    assert_eq!(std::fs::read_dir(&ws_path)?.count(), 1);
    Ok(())
}

#[tokio::test]
async fn spawn_rejects_path_traversal_in_payload() -> anyhow::Result<()> {
    let db = test_db().await?;
    let root_dir = tempfile::tempdir()?;
    create_root(&db, root_dir.path()).await?;

    for bad in ["../evil.sh", "nested/file.txt", "back\\slash", "a..b"] {
        let payload = vec![(bad.to_string(), "x".to_string())];
        let err = spawn_child(&db, &NullSink, root_dir.path(), GENESIS_ID, 10.0, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, EconomyError::InvalidState(_)), "{bad}");
    }

    let mut conn = db.pool().acquire().await?;
    assert_eq!(agents::list_agents(&mut conn).await?.len(), 1);
    assert_eq!(
        ledger::balance(&mut conn, GENESIS_ID).await?,
        GENESIS_INITIAL_CREDITS
    );
    Ok(())
}

#[tokio::test]
async fn dead_parent_cannot_spawn() -> anyhow::Result<()> {
    let db = test_db().await?;
    let root_dir = tempfile::tempdir()?;

    let mut corpse = support::sample_agent("corpse", 1000.0);
    corpse.status = economy::model::AgentStatus::Dead;
    {
        let mut conn = db.pool().acquire().await?;
        agents::insert_agent(&mut conn, &corpse).await?;
    }

    let err = spawn_child(&db, &NullSink, root_dir.path(), "corpse", 10.0, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, EconomyError::InvalidState(_)));
    Ok(())
}

#[tokio::test]
async fn spawn_rejects_negative_grant() -> anyhow::Result<()> {
    let db = test_db().await?;
    let root_dir = tempfile::tempdir()?;
    create_root(&db, root_dir.path()).await?;

    let err = spawn_child(&db, &NullSink, root_dir.path(), GENESIS_ID, -1.0, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, EconomyError::InvalidAmount));
    Ok(())
}
