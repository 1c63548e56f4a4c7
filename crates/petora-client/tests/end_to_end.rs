//! Drives the client views against a live router on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use uuid::Uuid;

use petora_api::{AppStateInner, router};
use petora_client::checkout::{CheckoutPhase, CheckoutView};
use petora_client::group_chat::{ChatPhase, GroupChat};
use petora_client::post_card::{LikeState, PostCard};
use petora_client::{ClientConfig, ClientError, HttpApi, PetoraApi, Viewer};
use petora_db::Database;
use petora_types::api::{CreateGroupRequest, CreateListingRequest, CreatePostRequest};
use petora_types::models::ListingType;

async fn spawn_server() -> Arc<HttpApi> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppStateInner::new(Database::open_in_memory().unwrap()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ClientConfig::new(format!("http://{}", addr));
    Arc::new(HttpApi::new(&config).unwrap())
}

async fn corgi_club(api: &HttpApi) -> Uuid {
    api.create_group(&CreateGroupRequest {
        name: "Corgi Club".into(),
        description: "Short legs".into(),
        image_url: String::new(),
        owner_id: "owner".into(),
    })
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn join_then_chat() {
    let api = spawn_server().await;
    let group_id = corgi_club(&api).await;
    let viewer = Viewer::new("u1", "Asha");

    let chat = GroupChat::new(Arc::clone(&api), group_id);
    chat.refresh().await;
    assert_eq!(chat.with_state(|s| s.phase()), ChatPhase::Ready);

    // Not a member yet.
    assert!(!chat.send(Some(&viewer), "hello").await);
    chat.take_notices();

    assert!(chat.join(Some(&viewer)).await);
    assert_eq!(chat.with_state(|s| s.group().unwrap().members), 2);

    assert!(chat.send(Some(&viewer), "hello").await);
    assert!(chat.send(Some(&viewer), "anyone here?").await);

    let texts = chat
        .with_state(|s| s.messages().map(|m| m.message.clone()).collect::<Vec<_>>());
    assert_eq!(texts, vec!["hello", "anyone here?"]);

    // Joining again keeps the count.
    let again = api.join_group(group_id, "u1").await.unwrap();
    assert!(!again.joined);
    assert_eq!(again.members, 2);
}

#[tokio::test]
async fn polling_picks_up_other_senders() {
    let api = spawn_server().await;
    let group_id = corgi_club(&api).await;

    let chat = GroupChat::new(Arc::clone(&api), group_id);
    let handle = chat.start_polling(Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(chat.with_state(|s| s.phase()), ChatPhase::Ready);

    let other = GroupChat::new(Arc::clone(&api), group_id);
    other.refresh().await;
    assert!(other.send(Some(&Viewer::new("owner", "Ravi")), "walk at 5?").await);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let count = chat.with_state(|s| s.entries().len());
    assert_eq!(count, 1);

    // Stopped views stay usable for manual refreshes.
    handle.stop();
    assert!(other.send(Some(&Viewer::new("owner", "Ravi")), "bring treats").await);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(chat.with_state(|s| s.entries().len()), 1);

    chat.refresh().await;
    assert_eq!(chat.with_state(|s| s.entries().len()), 2);
}

#[tokio::test]
async fn unknown_group_is_not_found() {
    let api = spawn_server().await;
    let chat = GroupChat::new(Arc::clone(&api), Uuid::new_v4());
    chat.refresh().await;
    assert_eq!(chat.with_state(|s| s.phase()), ChatPhase::NotFound);
}

#[tokio::test]
async fn like_and_comment_round_trip() {
    let api = spawn_server().await;
    let post = api
        .create_post(&CreatePostRequest {
            author: "Asha".into(),
            author_id: "u1".into(),
            author_avatar: String::new(),
            content: "Park day".into(),
            image_url: None,
        })
        .await
        .unwrap();
    let viewer = Viewer::new("u2", "Ravi");

    let mut card = PostCard::new(Arc::clone(&api), post, Some(&viewer));
    card.toggle_like(Some(&viewer)).await;
    assert_eq!(card.state().like(), LikeState { liked: true, count: 1 });
    card.toggle_like(Some(&viewer)).await;
    assert_eq!(card.state().like(), LikeState { liked: false, count: 0 });

    card.state_mut().set_draft("cute!");
    assert!(card.submit_comment(Some(&viewer)).await);
    assert_eq!(card.state().comments().len(), 1);
    assert_eq!(card.state().comments()[0].comment, "cute!");
    assert_eq!(card.state().draft(), "");

    let feed = api.list_posts(10, None).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].comments.len(), 1);
}

#[tokio::test]
async fn checkout_reads_listing() {
    let api = spawn_server().await;
    let listing = api
        .create_listing(&CreateListingRequest {
            name: "Biscuit".into(),
            breed: "Beagle".into(),
            image_url: String::new(),
            price: Some(4500),
            listing_type: ListingType::Sale,
            owner_name: Some("Meera".into()),
            owner_email: Some("meera@example.com".into()),
        })
        .await
        .unwrap();

    let mut view = CheckoutView::new(Arc::clone(&api), listing.id);
    view.load().await;
    assert!(matches!(view.state().phase(), CheckoutPhase::Ready(_)));
    assert_eq!(view.state().seller().unwrap().display_name, "Meera");
    assert_eq!(view.state().total_label().as_deref(), Some("₹4500"));

    let redirect = view.state_mut().confirm(Some(&Viewer::new("u1", "Asha")));
    assert_eq!(redirect, Some(format!("/pets/{}", listing.id)));

    let missing = api.get_listing(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(ClientError::NotFound)));
}
