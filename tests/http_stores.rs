use std::time::Duration;

use chrono::NaiveDate;
use cricd_ingest::classify::EventType;
use cricd_ingest::model::{Delivery, Player, Team};
use cricd_ingest::publish::{EventSink, HttpEventStore};
use cricd_ingest::store::{EntityStore, HttpEntityStore, MatchQuery};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entity_store(server: &MockServer) -> HttpEntityStore {
    let base = Url::parse(&server.uri()).unwrap();
    HttpEntityStore::with_base(base, Duration::from_secs(1)).unwrap()
}

fn event_store(server: &MockServer, timeout: Duration) -> HttpEventStore {
    let base = Url::parse(&server.uri()).unwrap();
    HttpEventStore::with_base(base, timeout).unwrap()
}

fn query() -> MatchQuery {
    MatchQuery {
        home_team: 2,
        away_team: 1,
        number_of_innings: 1,
        limited_overs: 20,
        start_date: NaiveDate::from_ymd_opt(2005, 2, 17).unwrap(),
    }
}

fn delivery() -> Delivery {
    Delivery {
        match_id: 9,
        event_type: EventType::Caught,
        timestamp: NaiveDate::from_ymd_opt(2005, 2, 17).unwrap(),
        innings: 1,
        over: 0,
        ball: 4,
        batting_team: Team::named("Australia").with_id(1),
        fielding_team: Team::named("New Zealand").with_id(2),
        striker: Player::named("MJ Clarke").with_id(11),
        non_striker: Player::named("RT Ponting").with_id(12),
        bowler: Player::named("DR Tuffey").with_id(20),
        runs: 0,
        fielder: Some(Player::named("SB Styris").with_id(21)),
        dismissed_batsman: None,
    }
}

#[tokio::test]
async fn test_find_teams_sends_name_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/teams"))
        .and(query_param("name", "New Zealand"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "name": "New Zealand"},
            {"id": 5, "name": "New Zealand"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let teams = entity_store(&server).find_teams("New Zealand").await.unwrap();
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0].id, Some(2));
}

#[tokio::test]
async fn test_find_players_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/players"))
        .and(query_param("name", "BB McCullum"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let players = entity_store(&server).find_players("BB McCullum").await.unwrap();
    assert!(players.is_empty());
}

#[tokio::test]
async fn test_create_player_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/players"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("name=SB+Styris"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 21,
            "name": "SB Styris",
            "dateOfBirth": "0001-01-01T00:00:00Z",
            "gender": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let player = entity_store(&server).create_player("SB Styris").await.unwrap();
    assert_eq!(player.id, Some(21));
    assert_eq!(player.date_of_birth, None);
}

#[tokio::test]
async fn test_match_query_and_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/matches"))
        .and(query_param("homeTeam", "2"))
        .and(query_param("awayTeam", "1"))
        .and(query_param("numberOfInnings", "1"))
        .and(query_param("limitedOvers", "20"))
        .and(query_param("startDate", "2005-02-17"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/matches"))
        .and(body_string_contains("homeTeam=2"))
        .and(body_string_contains("awayTeam=1"))
        .and(body_string_contains("startDate=2005-02-17"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
        .expect(1)
        .mount(&server)
        .await;

    let store = entity_store(&server);
    assert!(store.find_matches(&query()).await.unwrap().is_empty());
    assert_eq!(store.create_match(&query()).await.unwrap().id, Some(9));
}

#[tokio::test]
async fn test_create_requires_201() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/teams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3, "name": "Kenya"})))
        .mount(&server)
        .await;

    let err = entity_store(&server).create_team("Kenya").await.unwrap_err();
    assert_eq!(err.kind(), "status");
}

#[tokio::test]
async fn test_lookup_requires_200() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/teams"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = entity_store(&server).find_teams("Kenya").await.unwrap_err();
    assert_eq!(err.kind(), "status");
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/teams"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = entity_store(&server).find_teams("Kenya").await.unwrap_err();
    assert_eq!(err.kind(), "malformed_response");
}

#[tokio::test]
async fn test_create_without_id_decodes_as_unset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/teams"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 0, "name": "Kenya"})))
        .mount(&server)
        .await;

    let team = entity_store(&server).create_team("Kenya").await.unwrap();
    assert_eq!(team.id, None);
}

#[tokio::test]
async fn test_lookup_timeout_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/teams"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let store = HttpEntityStore::with_base(base, Duration::from_millis(100)).unwrap();
    let err = store.find_teams("Kenya").await.unwrap_err();
    assert_eq!(err.kind(), "transport");
}

#[tokio::test]
async fn test_publish_posts_event_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/event"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "match": 9,
            "eventType": "caught",
            "timestamp": "2005-02-17",
            "ball": {
                "battingTeam": {"id": 1, "name": "Australia"},
                "fieldingTeam": {"id": 2, "name": "New Zealand"},
                "innings": 1,
                "over": 0,
                "ball": 4
            },
            "runs": 0,
            "batsmen": {
                "striker": {"id": 11, "name": "MJ Clarke"},
                "nonStriker": {"id": 12, "name": "RT Ponting"}
            },
            "bowler": {"id": 20, "name": "DR Tuffey"},
            "fielder": {"id": 21, "name": "SB Styris"}
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    event_store(&server, Duration::from_secs(2))
        .publish(&delivery())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_publish_requires_201() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/event"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = event_store(&server, Duration::from_secs(2))
        .publish(&delivery())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "status");
}

#[tokio::test]
async fn test_publish_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/event"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = event_store(&server, Duration::from_millis(100))
        .publish(&delivery())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "transport");
}

#[tokio::test]
async fn test_unresolved_delivery_never_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/event"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mut d = delivery();
    d.bowler = Player::named("DR Tuffey");
    let err = event_store(&server, Duration::from_secs(2))
        .publish(&d)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "precondition");
}
