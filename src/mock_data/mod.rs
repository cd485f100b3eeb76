// =====================================================
// MOCK DATA MODULE
// Seeded in-memory endpoints for tests and demos
// =====================================================

use crate::db::connections::EndpointPool;
use crate::db::query_execution::{execute, run_script};
use crate::sqlite::create_memory_pool;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::json;


const SOURCE_SCHEMA: &str = r#"
CREATE TABLE PROJECTS (
    ID INTEGER PRIMARY KEY,
    NAME TEXT NOT NULL,
    DESCRIPTION TEXT
);
INSERT INTO PROJECTS VALUES (1, 'Enterprise Resource Planning (ERP) Implementation', 'Comprehensive ERP system rollout across organization');
INSERT INTO PROJECTS VALUES (2, 'Customer Relationship Management (CRM) Upgrade', 'Modernizing customer engagement and tracking system');
INSERT INTO PROJECTS VALUES (3, 'Supply Chain Optimization Project', 'Improving logistics and supply chain efficiency');

CREATE TABLE TASKS (
    ID INTEGER PRIMARY KEY,
    PROJECT_ID INTEGER,
    NAME TEXT NOT NULL,
    DESCRIPTION TEXT,
    STATUS TEXT,
    ASSIGNEE TEXT,
    PRIORITY TEXT,
    FOREIGN KEY (PROJECT_ID) REFERENCES PROJECTS(ID)
);
INSERT INTO TASKS VALUES (1, 1, 'Requirements Analysis', 'Conduct comprehensive requirements gathering', 'In Progress', 'John Anderson', 'High');
INSERT INTO TASKS VALUES (2, 1, 'System Design', 'Create detailed technical design', 'Planned', 'Emily Roberts', 'High');
INSERT INTO TASKS VALUES (3, 2, 'Current System Audit', 'Analyze existing CRM capabilities', 'Not Started', 'Michael Chen', 'Medium');

CREATE TABLE HR_ALL_PEOPLE (
    PERSON_ID INTEGER PRIMARY KEY,
    FULL_NAME TEXT,
    EMAIL_ADDRESS TEXT,
    PHONE_NUMBER TEXT,
    DEPARTMENT_NAME TEXT,
    JOB_TITLE TEXT
);
INSERT INTO HR_ALL_PEOPLE VALUES (101, 'John Anderson', 'john.anderson@example.com', '555-0101', 'Engineering', 'Project Manager');
INSERT INTO HR_ALL_PEOPLE VALUES (102, 'Emily Roberts', 'emily.roberts@example.com', '555-0102', 'Engineering', 'System Architect');
INSERT INTO HR_ALL_PEOPLE VALUES (103, 'Michael Chen', 'michael.chen@example.com', '555-0103', 'Operations', 'Business Analyst');
INSERT INTO HR_ALL_PEOPLE VALUES (104, NULL, 'dana.hollis@example.com', NULL, 'Operations', 'Coordinator');
"#;

const DEST_SCHEMA: &str = r#"
CREATE TABLE PA_PROJECTS (
    ID INTEGER PRIMARY KEY,
    NAME TEXT,
    DESCRIPTION TEXT
);
INSERT INTO PA_PROJECTS VALUES (1, 'ERP Rollout', 'Legacy project record');
INSERT INTO PA_PROJECTS VALUES (2, 'CRM Refresh', 'Legacy project record');

CREATE TABLE RSRC (
    RSRC_ID INTEGER PRIMARY KEY,
    NAME TEXT NOT NULL,
    EMAIL TEXT,
    PHONE TEXT,
    DEPARTMENT TEXT,
    ROLE TEXT
);
INSERT INTO RSRC VALUES (1, 'John Anderson', 'john.anderson@example.com', '555-0101', 'Engineering', 'PM');
INSERT INTO RSRC VALUES (2, 'Priya Sharma', 'priya.sharma@example.com', '555-0204', 'Finance', 'Controller');
"#;

pub async fn seed_source(endpoint: &EndpointPool) -> Result<(), String> {
    run_script(endpoint, SOURCE_SCHEMA)
        .await
        .map_err(|e| format!("Failed to seed source endpoint: {}", e))
}

pub async fn seed_dest(endpoint: &EndpointPool) -> Result<(), String> {
    run_script(endpoint, DEST_SCHEMA)
        .await
        .map_err(|e| format!("Failed to seed destination endpoint: {}", e))
}

/// Seeded in-memory source endpoint (PROJECTS, TASKS, HR_ALL_PEOPLE).
pub async fn source_endpoint() -> Result<EndpointPool, String> {
    let pool = create_memory_pool().await?;
    let endpoint = EndpointPool::from_sqlite(pool);
    seed_source(&endpoint).await?;
    Ok(endpoint)
}

/// Seeded in-memory destination endpoint (PA_PROJECTS, RSRC).
pub async fn dest_endpoint() -> Result<EndpointPool, String> {
    let pool = create_memory_pool().await?;
    let endpoint = EndpointPool::from_sqlite(pool);
    seed_dest(&endpoint).await?;
    Ok(endpoint)
}

// --- Generated People ---

const FIRST_NAMES: &[&str] = &[
    "Ava", "Noah", "Mia", "Liam", "Zoe", "Ethan", "Ivy", "Lucas", "Nora", "Owen",
];
const LAST_NAMES: &[&str] = &[
    "Castillo", "Feld", "Gagnon", "Hsu", "Iyer", "Jansen", "Kovacs", "Lindqvist", "Moreau", "Nkemdirim",
];
const DEPARTMENTS: &[&str] = &["Engineering", "Operations", "Finance", "Sales"];
const JOB_TITLES: &[&str] = &["Engineer", "Analyst", "Coordinator", "Manager"];

#[derive(Debug, Clone)]
pub struct SamplePerson {
    pub person_id: i64,
    pub full_name: String,
    pub email: String,
    pub department: String,
    pub job_title: String,
}

/// Deterministic batch of extra people for padding the source endpoint.
/// Ids start above the fixed fixture rows; emails are unique per index.
pub fn sample_people(count: usize, seed: u64) -> Vec<SamplePerson> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|index| {
            let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
            let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
            let department = DEPARTMENTS[rng.gen_range(0..DEPARTMENTS.len())];
            let job_title = JOB_TITLES[rng.gen_range(0..JOB_TITLES.len())];
            SamplePerson {
                person_id: 1000 + index as i64,
                full_name: format!("{} {}", first, last),
                email: format!(
                    "{}.{}.{}@example.com",
                    first.to_lowercase(),
                    last.to_lowercase(),
                    index
                ),
                department: department.to_string(),
                job_title: job_title.to_string(),
            }
        })
        .collect()
}

pub async fn seed_people(endpoint: &EndpointPool, people: &[SamplePerson]) -> Result<(), String> {
    for person in people {
        execute(
            endpoint,
            "INSERT INTO HR_ALL_PEOPLE (PERSON_ID, FULL_NAME, EMAIL_ADDRESS, DEPARTMENT_NAME, JOB_TITLE) VALUES (?, ?, ?, ?, ?)",
            &[
                json!(person.person_id),
                json!(person.full_name),
                json!(person.email),
                json!(person.department),
                json!(person.job_title),
            ],
        )
        .await
        .map_err(|e| format!("Failed to insert sample person {}: {}", person.person_id, e))?;
    }
    Ok(())
}
