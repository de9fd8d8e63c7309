// ==========================================
// 并发控制测试
// ==========================================
// 职责: 验证守卫式 UPDATE 与并行导入
// - 同一公司并发审批/拒绝，只有一个成功
// - 同一联系人并发审批，只有一个成功
// - 多文件并行导入互不影响
// ==========================================

mod test_helpers;

use lead_pipeline::api::ApiError;
use lead_pipeline::domain::{NewCompany, NewContact};
use lead_pipeline::importer::UploadFile;
use lead_pipeline::{CompanyStatus, EntityType};
use std::sync::Arc;
use std::thread;
use test_helpers::{count_rows, setup_env};

#[test]
fn test_concurrent_decisions_on_same_company() {
    let env = setup_env();
    let segment = env
        .state
        .segment_api
        .create_segment(&env.users.owner, "Fintech", None)
        .unwrap();
    let company = env
        .state
        .company_api
        .create_company(
            &env.users.researcher,
            NewCompany {
                name: "Acme Inc".to_string(),
                segment_id: segment.id.clone(),
                ..Default::default()
            },
        )
        .unwrap();

    let api = Arc::clone(&env.state.company_api);
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let api = Arc::clone(&api);
            let actor = env.users.approver.clone();
            let id = company.id.clone();
            thread::spawn(move || {
                if i % 2 == 0 {
                    api.approve_company(&actor, &id)
                } else {
                    api.reject_company(&actor, &id, "not a fit")
                }
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let succeeded: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(succeeded.len(), 1, "恰好一个决策成功");
    for r in &results {
        if let Err(e) = r {
            assert!(matches!(e, ApiError::InvalidStateTransition { .. }), "{:?}", e);
        }
    }

    let final_state = env
        .state
        .company_api
        .get_company(&env.users.approver, &company.id)
        .unwrap();
    assert_eq!(final_state.status, succeeded[0].status);
    assert_ne!(final_state.status, CompanyStatus::Pending);

    // 审计只记录成功的那一次
    let trail = env
        .state
        .audit_log_repo
        .find_by_entity("company", &company.id)
        .unwrap();
    let decisions = trail
        .iter()
        .filter(|e| e.action == "approve" || e.action == "reject")
        .count();
    assert_eq!(decisions, 1);
}

#[test]
fn test_concurrent_contact_approval() {
    let env = setup_env();
    let segment = env
        .state
        .segment_api
        .create_segment(&env.users.owner, "Fintech", None)
        .unwrap();
    let company = env
        .state
        .company_api
        .create_company(
            &env.users.researcher,
            NewCompany {
                name: "Acme Inc".to_string(),
                segment_id: segment.id,
                ..Default::default()
            },
        )
        .unwrap();
    env.state
        .company_api
        .approve_company(&env.users.approver, &company.id)
        .unwrap();
    let contact = env
        .state
        .contact_api
        .create_contact(
            &env.users.researcher,
            NewContact {
                first_name: "Wile".to_string(),
                last_name: "Coyote".to_string(),
                email: "wile@acme.com".to_string(),
                company_id: company.id,
                ..Default::default()
            },
        )
        .unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let api = Arc::clone(&env.state.contact_api);
            let actor = env.users.approver.clone();
            let id = contact.id.clone();
            thread::spawn(move || api.approve_contact(&actor, &id))
        })
        .collect();

    let ok = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(Result::is_ok)
        .count();
    assert_eq!(ok, 1);
}

#[tokio::test]
async fn test_parallel_uploads_are_independent() {
    let env = setup_env();
    env.state
        .segment_api
        .create_segment(&env.users.owner, "Fintech", None)
        .unwrap();

    let files = vec![
        UploadFile {
            file_name: "good.csv".to_string(),
            bytes: b"Company Name,Segment Name\nAcme Inc,Fintech\nGlobex,Fintech\n".to_vec(),
        },
        UploadFile {
            file_name: "headers.csv".to_string(),
            bytes: b"Name,Segment\nAcme,Fintech\n".to_vec(),
        },
        UploadFile {
            file_name: "mixed.csv".to_string(),
            bytes: b"Company Name,Segment Name\nInitech,Fintech\nHooli,Nowhere\n".to_vec(),
        },
    ];

    let results = env
        .state
        .upload_api
        .upload_many(&env.users.researcher, EntityType::Company, files)
        .await
        .unwrap();
    assert_eq!(results.len(), 3);

    let good = results[0].as_ref().unwrap();
    assert_eq!((good.valid_rows, good.invalid_rows), (2, 0));
    assert!(matches!(results[1], Err(ApiError::ImportRejected(_))));
    let mixed = results[2].as_ref().unwrap();
    assert_eq!((mixed.valid_rows, mixed.invalid_rows), (1, 1));

    assert_eq!(count_rows(&env.db_path, "upload_batches").unwrap(), 2);
    assert_eq!(count_rows(&env.db_path, "companies").unwrap(), 3);
    assert_eq!(
        env.state
            .upload_api
            .list_batches(&env.users.researcher)
            .unwrap()
            .len(),
        2
    );
}
