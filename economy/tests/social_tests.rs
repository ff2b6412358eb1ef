mod support;

use economy::error::EconomyError;
use economy::social::{inbox, send_message};
use support::{add_agent, test_db};

#[tokio::test]
async fn messages_land_in_the_recipient_inbox() -> anyhow::Result<()> {
    let db = test_db().await?;
    add_agent(&db, "alice", 10.0).await?;
    add_agent(&db, "bob", 10.0).await?;

    let mut conn = db.pool().acquire().await?;
    send_message(&mut conn, "alice", "bob", "ping").await?;
    send_message(&mut conn, "bob", "alice", "pong").await?;
    send_message(&mut conn, "alice", "bob", "again").await?;

    let bob_inbox = inbox(&mut conn, "bob").await?;
    assert_eq!(bob_inbox.len(), 2);
    assert!(bob_inbox.iter().all(|m| m.to_agent == "bob"));

    let alice_inbox = inbox(&mut conn, "alice").await?;
    assert_eq!(alice_inbox.len(), 1);
    assert_eq!(alice_inbox[0].content, "pong");
    Ok(())
}

#[tokio::test]
async fn messaging_requires_both_agents() -> anyhow::Result<()> {
    let db = test_db().await?;
    add_agent(&db, "alice", 10.0).await?;

    let mut conn = db.pool().acquire().await?;
    let err = send_message(&mut conn, "alice", "ghost", "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, EconomyError::NotFound { entity: "agent", .. }));

    let err = send_message(&mut conn, "ghost", "alice", "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, EconomyError::NotFound { entity: "agent", .. }));
    Ok(())
}
