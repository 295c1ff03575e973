// tests/db_flow_tests.rs
//
// End-to-end flows against a real Postgres. Skipped unless DATABASE_URL is set.

use school_office::{
    config::Config, routes, state::AppState, utils::hash::hash_password,
};
use serde_json::{Value, json};
use sqlx::{PgPool, postgres::PgPoolOptions};

struct TestApp {
    address: String,
    pool: PgPool,
    client: reqwest::Client,
    token: String,
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..10])
}

/// Spawns the app against DATABASE_URL and logs in as a freshly seeded admin.
async fn spawn_app() -> Option<TestApp> {
    let database_url = std::env::var("DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let admin = unique("admin");
    sqlx::query("INSERT INTO users (username, password, role) VALUES ($1, $2, 'admin')")
        .bind(&admin)
        .bind(hash_password("admin-pass").unwrap())
        .execute(&pool)
        .await
        .expect("Failed to seed admin");

    let config = Config {
        database_url,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        bind_addr: "127.0.0.1:0".to_string(),
        db_max_connections: 2,
    };

    let app = routes::create_router(AppState {
        pool: pool.clone(),
        config,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let address = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let login: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "username": admin, "password": "admin-pass" }))
        .send()
        .await
        .expect("Login request failed")
        .json()
        .await
        .unwrap();
    let token = login["data"]["token"].as_str().expect("No token").to_string();

    Some(TestApp {
        address,
        pool,
        client,
        token,
    })
}

impl TestApp {
    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .bearer_auth(&self.token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn put(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(format!("{}{}", self.address, path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn create_student(&self, name: &str, class: &str, roll: &str) -> i64 {
        let response = self
            .post(
                "/api/admin/students",
                json!({
                    "username": unique("stu"),
                    "password": "pass1234",
                    "full_name": name,
                    "current_class": class,
                    "roll_number": roll
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        body["data"]["user_id"].as_i64().unwrap()
    }

    async fn add_result(&self, student_id: i64, year: &str, exam: &str, subject: &str, marks: f64, max: f64) {
        let response = self
            .post(
                "/api/admin/results",
                json!({
                    "student_id": student_id,
                    "academic_year": year,
                    "exam_name": exam,
                    "subject_name": subject,
                    "marks_obtained": marks,
                    "max_marks": max
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
    }
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "username": "nobody_at_all", "password": "x" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn fee_record_is_computed_and_duplicates_are_skipped() {
    let Some(app) = spawn_app().await else { return };

    let student_id = app.create_student("Fee Student", "7", "1").await;

    let fee = json!({
        "student_id": student_id,
        "fee_year": 2024,
        "fee_month": 5,
        "base_monthly_fee": 1200,
        "monthly_van_fee": 300,
        "monthly_exam_fee": 0,
        "monthly_electricity_fee": 50,
        "amount_paid": 1550
    });

    let response = app.post("/api/admin/fees", fee.clone()).await;
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["amount_due"].as_f64(), Some(1550.0));
    assert_eq!(body["data"]["amount_remaining"].as_f64(), Some(0.0));
    assert_eq!(body["data"]["is_paid"], true);
    assert!(!body["data"]["payment_date"].is_null());

    // Same student and period again.
    let response = app.post("/api/admin/fees", fee).await;
    assert_eq!(response.status().as_u16(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "duplicate");

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM student_monthly_fees WHERE student_id = $1 AND fee_year = 2024 AND fee_month = 5",
    )
    .bind(student_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(count, 1);

    let summary: Value = app
        .get(&format!("/api/students/{}/fees", student_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(summary["data"]["months"].as_array().unwrap().len(), 1);
    assert_eq!(summary["data"]["unpaid_months"], 0);
}

#[tokio::test]
async fn fee_for_unknown_student_is_404() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .post(
            "/api/admin/fees",
            json!({ "student_id": i64::MAX, "fee_year": 2024, "fee_month": 1, "base_monthly_fee": 100 }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn exam_report_totals_and_percentage() {
    let Some(app) = spawn_app().await else { return };

    let year = "2024";
    let class = unique("c");
    let student_id = app.create_student("Report Student", &class, "1").await;
    app.add_result(student_id, year, "Mid-Term", "Math", 80.0, 100.0).await;
    app.add_result(student_id, year, "Mid-Term", "Science", 45.0, 50.0).await;

    let body: Value = app
        .get(&format!("/api/results?academic_year={}&current_class={}", year, class))
        .await
        .json()
        .await
        .unwrap();

    let student = &body["data"]["years"][0]["classes"][0]["exams"][0]["students"][0];
    assert_eq!(student["total_marks_obtained"].as_f64(), Some(125.0));
    assert_eq!(student["total_max_marks"].as_f64(), Some(150.0));
    assert_eq!(student["percentage"].as_f64(), Some(83.33));
}

#[tokio::test]
async fn csv_export_applies_both_filters() {
    let Some(app) = spawn_app().await else { return };

    let year = "2024";
    let class = unique("c");
    let other_class = unique("c");

    let inside = app.create_student("Inside", &class, "1").await;
    let outside = app.create_student("Outside", &other_class, "2").await;
    app.add_result(inside, year, "Final", "Math", 70.0, 100.0).await;
    app.add_result(outside, year, "Final", "Math", 90.0, 100.0).await;

    let response = app
        .get(&format!(
            "/api/results?download=csv&academic_year={}&current_class={}",
            year, class
        ))
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains(".csv"));

    let text = response.text().await.unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "User ID,Full Name,Roll Number,Current Class,Academic Year,Exam Name,Subject Name,Marks Obtained,Max Marks"
    );
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with(&format!("{},Inside,", inside)));
}

#[tokio::test]
async fn toppers_are_at_most_three_best_first() {
    let Some(app) = spawn_app().await else { return };

    let class = unique("c");
    for (i, marks) in [55.0, 91.0, 78.0, 64.0].into_iter().enumerate() {
        let id = app
            .create_student(&format!("Topper {}", i), &class, &i.to_string())
            .await;
        // A year far ahead so this test owns the latest year.
        app.add_result(id, "9999", "Final", "Math", marks, 100.0).await;
    }

    let body: Value = app.get("/api/results/toppers").await.json().await.unwrap();
    let toppers = body["data"]["toppers"].as_array().unwrap();

    assert_eq!(body["data"]["academic_year"], "9999");
    assert!(toppers.len() <= 3);

    let percentages: Vec<f64> = toppers
        .iter()
        .map(|t| t["percentage"].as_f64().unwrap())
        .collect();
    assert!(percentages.windows(2).all(|w| w[0] >= w[1]), "{:?}", percentages);
}

#[tokio::test]
async fn fee_update_recomputes_and_keeps_the_period() {
    let Some(app) = spawn_app().await else { return };

    let student_id = app.create_student("Update Student", "6", "4").await;

    let response = app
        .post(
            "/api/admin/fees",
            json!({
                "student_id": student_id,
                "fee_year": 2024,
                "fee_month": 8,
                "base_monthly_fee": 1000,
                "monthly_van_fee": 250.5,
                "amount_paid": 1250.5,
                "payment_date": "2024-08-03"
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["is_paid"], true);
    let fee_id = body["data"]["id"].as_i64().unwrap();

    // Payment reversed; the period fields in the body are not editable.
    let response = app
        .put(
            &format!("/api/admin/fees/{}", fee_id),
            json!({
                "fee_year": 2030,
                "fee_month": 1,
                "base_monthly_fee": 1000,
                "monthly_van_fee": 250.5,
                "amount_paid": 0,
                "payment_date": "2024-08-03"
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["fee_year"], 2024);
    assert_eq!(body["data"]["fee_month"], 8);
    assert_eq!(body["data"]["amount_due"].as_f64(), Some(1250.5));
    assert_eq!(body["data"]["amount_remaining"].as_f64(), Some(1250.5));
    assert_eq!(body["data"]["is_paid"], false);
    assert!(body["data"]["payment_date"].is_null());

    let (is_paid, payment_date): (bool, Option<chrono::NaiveDate>) = sqlx::query_as(
        "SELECT is_paid, payment_date FROM student_monthly_fees WHERE id = $1",
    )
    .bind(fee_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert!(!is_paid);
    assert_eq!(payment_date, None);
}

#[tokio::test]
async fn duplicate_result_is_409_and_not_written() {
    let Some(app) = spawn_app().await else { return };

    let student_id = app.create_student("Repeat Student", &unique("c"), "2").await;
    app.add_result(student_id, "2024", "Midterm", "Science", 40.0, 50.0).await;

    let response = app
        .post(
            "/api/admin/results",
            json!({
                "student_id": student_id,
                "academic_year": "2024",
                "exam_name": "Midterm",
                "subject_name": "Science",
                "marks_obtained": 45,
                "max_marks": 50
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "duplicate");
    assert!(body["message"].as_str().unwrap().contains("Science"));

    let marks: Vec<f64> = sqlx::query_scalar(
        "SELECT marks_obtained FROM student_exam_results WHERE student_id = $1",
    )
    .bind(student_id)
    .fetch_all(&app.pool)
    .await
    .unwrap();
    assert_eq!(marks, vec![40.0]);
}

#[tokio::test]
async fn failed_student_update_keeps_the_old_password() {
    let Some(app) = spawn_app().await else { return };

    // Rejects one marker name at the database so the profile UPDATE fails
    // after the password UPDATE has run.
    sqlx::query(
        r#"
        CREATE OR REPLACE FUNCTION reject_marked_student_name() RETURNS trigger AS $$
        BEGIN
            IF NEW.full_name = 'Rejected By Trigger' THEN
                RAISE EXCEPTION 'student name rejected';
            END IF;
            RETURN NEW;
        END;
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(&app.pool)
    .await
    .unwrap();
    sqlx::query(
        r#"
        DO $$
        BEGIN
            IF NOT EXISTS (SELECT 1 FROM pg_trigger WHERE tgname = 'trg_reject_marked_student_name') THEN
                CREATE TRIGGER trg_reject_marked_student_name
                BEFORE UPDATE ON students
                FOR EACH ROW EXECUTE FUNCTION reject_marked_student_name();
            END IF;
        END
        $$
        "#,
    )
    .execute(&app.pool)
    .await
    .unwrap();

    let student_id = app.create_student("Atomic Student", "5", "9").await;
    let password_before: String = sqlx::query_scalar("SELECT password FROM users WHERE id = $1")
        .bind(student_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let response = app
        .put(
            &format!("/api/admin/students/{}", student_id),
            json!({ "password": "brand-new-pass", "full_name": "Rejected By Trigger" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 500);

    let password_after: String = sqlx::query_scalar("SELECT password FROM users WHERE id = $1")
        .bind(student_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(password_after, password_before);

    // Without the marker name both changes land.
    let response = app
        .put(
            &format!("/api/admin/students/{}", student_id),
            json!({ "password": "brand-new-pass", "full_name": "Atomic Student Renamed" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let (name, password): (String, String) = sqlx::query_as(
        "SELECT s.full_name, u.password FROM students s JOIN users u ON u.id = s.user_id WHERE s.user_id = $1",
    )
    .bind(student_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(name, "Atomic Student Renamed");
    assert_ne!(password, password_before);
}
