// ==========================================
// 负责人分配测试
// ==========================================
// 测试范围:
// 1. 分配 / 重复分配冲突 / 未知用户与对象
// 2. 取消分配（软删除）与重新分配
// 3. 我的细分视图
// 4. 权限与审计
// ==========================================

mod test_helpers;

use lead_pipeline::api::ApiError;
use lead_pipeline::domain::{AssignmentFilter, NewCompany};
use lead_pipeline::AssignmentTarget;
use test_helpers::{count_rows, setup_env, TestEnv};

fn create_segment(env: &TestEnv, name: &str) -> String {
    env.state
        .segment_api
        .create_segment(&env.users.owner, name, None)
        .expect("创建细分失败")
        .id
}

#[test]
fn test_assign_segment_and_list_my_segments() {
    let env = setup_env();
    let fintech = create_segment(&env, "Fintech");
    let health = create_segment(&env, "Health");
    create_segment(&env, "Retail");

    let api = &env.state.assignment_api;
    let a = api
        .create_assignment(&env.users.owner, AssignmentTarget::Segment, &fintech, &env.users.researcher)
        .unwrap();
    assert!(a.is_active);
    assert_eq!(a.assigned_by, env.users.owner);
    api.create_assignment(&env.users.owner, AssignmentTarget::Segment, &health, &env.users.researcher)
        .unwrap();

    let mine = api.list_my_segments(&env.users.researcher).unwrap();
    let names: Vec<_> = mine.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Fintech", "Health"]);

    // 归档的细分不出现在工作台
    env.state
        .segment_api
        .archive_segment(&env.users.owner, &health)
        .unwrap();
    assert_eq!(api.list_my_segments(&env.users.researcher).unwrap().len(), 1);

    // 其他用户看不到
    assert!(api.list_my_segments(&env.users.sdr).unwrap().is_empty());

    let on_fintech = api
        .list_assignments(
            &env.users.researcher,
            &AssignmentFilter::for_entity(AssignmentTarget::Segment, &fintech),
        )
        .unwrap();
    assert_eq!(on_fintech.len(), 1);
    assert_eq!(on_fintech[0].id, a.id);

    let trail = env
        .state
        .audit_log_repo
        .find_by_entity("segment", &fintech)
        .unwrap();
    let assign = trail.iter().find(|e| e.action == "assign").unwrap();
    assert_eq!(assign.actor_id.as_deref(), Some(env.users.owner.as_str()));
    let details = assign.details.as_ref().unwrap();
    assert_eq!(details["assigned_to"], env.users.researcher.as_str());
}

#[test]
fn test_duplicate_active_assignment_conflicts() {
    let env = setup_env();
    let fintech = create_segment(&env, "Fintech");
    let api = &env.state.assignment_api;

    api.create_assignment(&env.users.owner, AssignmentTarget::Segment, &fintech, &env.users.researcher)
        .unwrap();
    let again =
        api.create_assignment(&env.users.approver, AssignmentTarget::Segment, &fintech, &env.users.researcher);
    assert!(matches!(again, Err(ApiError::Conflict(_))));
    assert_eq!(count_rows(&env.db_path, "assignments").unwrap(), 1);

    // 同一细分分配给另一用户不冲突
    api.create_assignment(&env.users.owner, AssignmentTarget::Segment, &fintech, &env.users.sdr)
        .unwrap();
}

#[test]
fn test_unknown_assignee_or_entity_is_not_found() {
    let env = setup_env();
    let fintech = create_segment(&env, "Fintech");
    let api = &env.state.assignment_api;

    let no_user =
        api.create_assignment(&env.users.owner, AssignmentTarget::Segment, &fintech, "no-such-user");
    assert!(matches!(no_user, Err(ApiError::NotFound(_))));

    let no_company =
        api.create_assignment(&env.users.owner, AssignmentTarget::Company, "no-such-company", &env.users.sdr);
    assert!(matches!(no_company, Err(ApiError::NotFound(_))));

    assert_eq!(count_rows(&env.db_path, "assignments").unwrap(), 0);
}

#[test]
fn test_unassign_is_soft_and_allows_reassign() {
    let env = setup_env();
    let fintech = create_segment(&env, "Fintech");
    let company = env
        .state
        .company_api
        .create_company(
            &env.users.researcher,
            NewCompany {
                name: "Acme Inc".to_string(),
                segment_id: fintech,
                ..Default::default()
            },
        )
        .unwrap();

    let api = &env.state.assignment_api;
    let a = api
        .create_assignment(&env.users.approver, AssignmentTarget::Company, &company.id, &env.users.sdr)
        .unwrap();

    let removed = api.delete_assignment(&env.users.approver, &a.id).unwrap();
    assert!(!removed.is_active);
    assert_eq!(count_rows(&env.db_path, "assignments").unwrap(), 1);
    assert!(api
        .list_assignments(&env.users.sdr, &AssignmentFilter::for_user(&env.users.sdr))
        .unwrap()
        .is_empty());

    let twice = api.delete_assignment(&env.users.approver, &a.id);
    assert!(matches!(twice, Err(ApiError::NotFound(_))));

    api.create_assignment(&env.users.approver, AssignmentTarget::Company, &company.id, &env.users.sdr)
        .unwrap();

    let actions: Vec<String> = env
        .state
        .audit_log_repo
        .find_by_entity("company", &company.id)
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(actions.iter().filter(|a| *a == "assign").count(), 2);
    assert_eq!(actions.iter().filter(|a| *a == "unassign").count(), 1);
}

#[test]
fn test_assignment_permissions() {
    let env = setup_env();
    let fintech = create_segment(&env, "Fintech");
    let api = &env.state.assignment_api;

    let denied =
        api.create_assignment(&env.users.researcher, AssignmentTarget::Segment, &fintech, &env.users.researcher);
    assert!(matches!(denied, Err(ApiError::PermissionDenied { .. })));

    let a = api
        .create_assignment(&env.users.owner, AssignmentTarget::Segment, &fintech, &env.users.researcher)
        .unwrap();
    let denied = api.delete_assignment(&env.users.sdr, &a.id);
    assert!(matches!(denied, Err(ApiError::PermissionDenied { .. })));

    let denied = api.list_assignments(&env.users.marketing, &AssignmentFilter::default());
    assert!(matches!(denied, Err(ApiError::PermissionDenied { .. })));

    // 拒绝的操作不改动分配
    let still = api
        .list_assignments(&env.users.owner, &AssignmentFilter::for_user(&env.users.researcher))
        .unwrap();
    assert_eq!(still.len(), 1);
    assert!(still[0].is_active);
}
