use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use filmrate_api::routes::{create_router, AppState};

fn create_test_server() -> TestServer {
    let app = create_router(AppState::in_memory());
    TestServer::new(app).unwrap()
}

async fn create_user(server: &TestServer, login: &str) -> i64 {
    let response = server
        .post("/users")
        .json(&json!({
            "email": format!("{}@example.com", login),
            "login": login,
            "birthday": "1990-01-01"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap()
}

async fn create_film(server: &TestServer, name: &str) -> i64 {
    let response = server
        .post("/films")
        .json(&json!({
            "name": name,
            "description": "",
            "releaseDate": "2000-01-01",
            "duration": 100,
            "mpa": { "id": 1 }
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap()
}

async fn like(server: &TestServer, film_id: i64, user_id: i64) {
    server
        .put(&format!("/films/{}/like/{}", film_id, user_id))
        .await
        .assert_status_ok();
}

fn names(films: &Value) -> Vec<String> {
    films
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let response = server.get("/health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_create_user_defaults_name_to_login() {
    let server = create_test_server();
    let user_id = create_user(&server, "ann").await;

    let response = server.get(&format!("/users/{}", user_id)).await;
    response.assert_status_ok();
    let user: Value = response.json();
    assert_eq!(user["name"], "ann");
    assert_eq!(user["birthday"], "1990-01-01");
}

#[tokio::test]
async fn test_list_and_update_users() {
    let server = create_test_server();
    let ann = create_user(&server, "ann").await;
    let bob = create_user(&server, "bob").await;

    let response = server
        .put("/users")
        .json(&json!({
            "id": ann,
            "email": "ann@films.org",
            "login": "ann",
            "name": "Ann Smith",
            "birthday": "1991-02-03"
        }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["name"], "Ann Smith");

    let users: Value = server.get("/users").await.json();
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["id"], ann);
    assert_eq!(users[0]["email"], "ann@films.org");
    assert_eq!(users[1]["id"], bob);

    server
        .put("/users")
        .json(&json!({
            "id": bob + 100,
            "email": "ghost@example.com",
            "login": "ghost",
            "birthday": "1990-01-01"
        }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_and_update_films() {
    let server = create_test_server();
    let user = create_user(&server, "ann").await;
    let heat = create_film(&server, "Heat").await;
    create_film(&server, "Alien").await;
    like(&server, heat, user).await;

    let response = server
        .put("/films")
        .json(&json!({
            "id": heat,
            "name": "Heat (1995)",
            "description": "Cops and robbers",
            "releaseDate": "1995-12-15",
            "duration": 170,
            "mpa": { "id": 4 },
            "genres": [{ "id": 4 }]
        }))
        .await;
    response.assert_status_ok();
    let film: Value = response.json();
    assert_eq!(film["name"], "Heat (1995)");
    assert_eq!(film["mpa"]["name"], "R");
    assert_eq!(film["likes"], json!([user]));

    let films: Value = server.get("/films").await.json();
    assert_eq!(names(&films), vec!["Heat (1995)", "Alien"]);

    server
        .put("/films")
        .json(&json!({
            "id": heat + 100,
            "name": "Ghost",
            "releaseDate": "2000-01-01",
            "duration": 90,
            "mpa": { "id": 1 }
        }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_film_with_genres_and_director() {
    let server = create_test_server();

    let director: Value = server
        .post("/directors")
        .json(&json!({ "name": "Michael Mann" }))
        .await
        .json();

    let response = server
        .post("/films")
        .json(&json!({
            "name": "Heat",
            "description": "Cops and robbers",
            "releaseDate": "1995-12-15",
            "duration": 170,
            "mpa": { "id": 4 },
            "genres": [{ "id": 6 }, { "id": 4 }, { "id": 6 }],
            "directors": [{ "id": director["id"] }]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let film: Value = response.json();
    assert_eq!(film["mpa"]["name"], "R");
    assert_eq!(film["genres"], json!([{ "id": 4, "name": "Thriller" }, { "id": 6, "name": "Action" }]));
    assert_eq!(film["directors"][0]["name"], "Michael Mann");
}

#[tokio::test]
async fn test_create_film_with_unknown_mpa() {
    let server = create_test_server();
    let response = server
        .post("/films")
        .json(&json!({
            "name": "Heat",
            "releaseDate": "1995-12-15",
            "duration": 170,
            "mpa": { "id": 99 }
        }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_like_conflicts_and_missing_entities() {
    let server = create_test_server();
    let user = create_user(&server, "ann").await;
    let film = create_film(&server, "Heat").await;

    like(&server, film, user).await;
    server
        .put(&format!("/films/{}/like/{}", film, user))
        .await
        .assert_status(StatusCode::CONFLICT);

    server
        .put(&format!("/films/{}/like/{}", film, user + 100))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .delete(&format!("/films/{}/like/{}", film, user))
        .await
        .assert_status_ok();
    server
        .delete(&format!("/films/{}/like/{}", film, user))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommendation_flow() {
    let server = create_test_server();
    let u1 = create_user(&server, "u1").await;
    let u2 = create_user(&server, "u2").await;
    let f1 = create_film(&server, "F1").await;
    let f2 = create_film(&server, "F2").await;

    like(&server, f1, u1).await;
    like(&server, f1, u2).await;
    like(&server, f2, u2).await;

    let similar: Vec<i64> = server.get(&format!("/users/{}/similar", u1)).await.json();
    assert_eq!(similar, vec![u2]);

    let response = server.get(&format!("/users/{}/recommendations", u1)).await;
    response.assert_status_ok();
    let films: Value = response.json();
    assert_eq!(names(&films), vec!["F2"]);
    assert_eq!(films[0]["id"], f2);
}

#[tokio::test]
async fn test_recommendations_for_user_without_likes() {
    let server = create_test_server();
    let user = create_user(&server, "ann").await;

    let response = server.get(&format!("/users/{}/recommendations", user)).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!([]));
}

#[tokio::test]
async fn test_recommendations_for_unknown_user() {
    let server = create_test_server();
    server
        .get("/users/42/recommendations")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_popular_films() {
    let server = create_test_server();
    let u1 = create_user(&server, "u1").await;
    let u2 = create_user(&server, "u2").await;
    create_film(&server, "C").await;
    let b = create_film(&server, "B").await;
    let a = create_film(&server, "A").await;

    like(&server, a, u1).await;
    like(&server, a, u2).await;
    like(&server, b, u1).await;

    let films: Value = server.get("/films/popular?count=10").await.json();
    assert_eq!(names(&films), vec!["A", "B", "C"]);

    let films: Value = server.get("/films/popular?count=1").await.json();
    assert_eq!(names(&films), vec!["A"]);

    let films: Value = server.get("/films/popular").await.json();
    assert_eq!(films.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_popular_films_rejects_negative_count() {
    let server = create_test_server();
    server
        .get("/films/popular?count=-1")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_common_films() {
    let server = create_test_server();
    let u1 = create_user(&server, "u1").await;
    let u2 = create_user(&server, "u2").await;
    let u3 = create_user(&server, "u3").await;
    let f1 = create_film(&server, "F1").await;

    like(&server, f1, u1).await;
    like(&server, f1, u2).await;

    let films: Value = server
        .get(&format!("/films/common?userId={}&friendId={}", u1, u2))
        .await
        .json();
    assert_eq!(names(&films), vec!["F1"]);

    let films: Value = server
        .get(&format!("/films/common?userId={}&friendId={}", u1, u3))
        .await
        .json();
    assert_eq!(films, json!([]));
}

#[tokio::test]
async fn test_director_films_and_search() {
    let server = create_test_server();
    let user = create_user(&server, "ann").await;
    let director: Value = server
        .post("/directors")
        .json(&json!({ "name": "Ridley Scott" }))
        .await
        .json();
    let director_id = director["id"].as_i64().unwrap();

    let mut film_ids = Vec::new();
    for (name, date) in [("Gladiator", "2000-05-05"), ("Alien", "1979-05-25")] {
        let response = server
            .post("/films")
            .json(&json!({
                "name": name,
                "releaseDate": date,
                "duration": 120,
                "mpa": { "id": 4 },
                "directors": [{ "id": director_id }]
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        film_ids.push(response.json::<Value>()["id"].as_i64().unwrap());
    }
    like(&server, film_ids[0], user).await;

    let by_likes: Value = server
        .get(&format!("/films/director/{}?sortBy=likes", director_id))
        .await
        .json();
    assert_eq!(names(&by_likes), vec!["Gladiator", "Alien"]);

    let by_year: Value = server
        .get(&format!("/films/director/{}?sortBy=year", director_id))
        .await
        .json();
    assert_eq!(names(&by_year), vec!["Alien", "Gladiator"]);

    let found: Value = server
        .get("/films/search?query=scott&by=director,title")
        .await
        .json();
    assert_eq!(names(&found), vec!["Gladiator", "Alien"]);

    server
        .get("/films/search?query=alien&by=year")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reference_data() {
    let server = create_test_server();

    let genres: Value = server.get("/genres").await.json();
    assert_eq!(genres.as_array().unwrap().len(), 6);

    let mpa: Value = server.get("/mpa/3").await.json();
    assert_eq!(mpa["name"], "PG-13");

    server.get("/genres/99").await.assert_status(StatusCode::NOT_FOUND);
}
