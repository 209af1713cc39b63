//! 生命周期状态机契约测试。
//!
//! # 教案式说明
//! - **意图 (Why)**：验证 create → init → start/stop → destroy 的转换规则、失败语义与幂等拆卸；
//! - **逻辑 (How)**：以计数钩子观察调用次数，以共享注册表观察登记与注销；
//! - **契约 (What)**：失败的转换不修改阶段、不发布任何值，钩子错误原样返回。

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use spark_ml::{
    InMemoryRegistry, LifecycleState, Mode, Model, ModelError, ModelOptions, OperationTable,
    ParentHandle, RequestConfig, RunConfig, SubsystemKind, UserRequest,
};
use tracing_test::traced_test;

fn generic_model(registry: &Arc<InMemoryRegistry>, name: &str) -> Model {
    Model::builder()
        .subsystem_name("ml_lib_test")
        .model_name(name.to_owned())
        .parent_handle(ParentHandle::new("mllibdev"))
        .registry(Arc::<InMemoryRegistry>::clone(registry))
        .build()
}

#[test]
fn generic_create_registers_and_enters_emergency_mode() {
    let registry = Arc::new(InMemoryRegistry::new());
    let model = generic_model(&registry, "ml_model1");

    model.create().expect("通用 create 不应失败");

    assert_eq!(model.state(), LifecycleState::Created);
    assert_eq!(model.mode(), Mode::Emergency);
    assert_eq!(model.parent().kind(), SubsystemKind::Generic);
    assert!(registry.contains("mllibdev/ml_model1"));
    assert!(model.options().is_empty(), "create 不发布选项");
    assert!(model.dataset().is_empty(), "create 不发布数据集");
}

#[test]
fn operations_before_create_are_invalid() {
    let model = Model::builder().build();
    let err = model
        .init(ModelOptions::default())
        .expect_err("未 create 的模型不能 init");
    assert_eq!(err.code(), "ml.invalid_argument");

    let err = model
        .get_dataset(&RequestConfig::empty(), &UserRequest::empty())
        .expect_err("未 create 的模型不能获取数据集");
    assert_eq!(err.code(), "ml.invalid_argument");
    assert_eq!(model.state(), LifecycleState::Unknown);
}

#[test]
fn second_create_is_rejected_without_side_effects() {
    let registry = Arc::new(InMemoryRegistry::new());
    let model = generic_model(&registry, "twice");
    model.create().expect("首次 create");
    let err = model.create().expect_err("重复 create 应失败");
    assert_eq!(err.code(), "ml.invalid_argument");
    assert_eq!(registry.len(), 1, "重复 create 不应再次登记");
    assert_eq!(model.state(), LifecycleState::Created);
}

#[test]
fn failed_create_hook_rolls_back_registration() {
    let registry = Arc::new(InMemoryRegistry::new());
    let table = OperationTable::builder()
        .on_create(|_model| Err(ModelError::out_of_memory("model arena exhausted")))
        .build();
    let model = Model::builder()
        .model_name("faulty")
        .registry(Arc::<InMemoryRegistry>::clone(&registry))
        .operations(table)
        .build();

    let err = model.create().expect_err("钩子失败应传播");
    assert_eq!(
        err,
        ModelError::out_of_memory("model arena exhausted"),
        "钩子错误应原样返回"
    );
    assert_eq!(model.state(), LifecycleState::Unknown);
    assert!(registry.is_empty(), "钩子失败后登记必须撤销");
    assert!(model.registration().is_none());
}

#[test]
fn registration_failure_prevents_created_and_skips_hook() {
    let registry = Arc::new(InMemoryRegistry::new());
    let first = generic_model(&registry, "dup");
    first.create().expect("首个模型登记成功");

    let hook_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&hook_calls);
    let table = OperationTable::builder()
        .on_create(move |_model| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build();
    let second = Model::builder()
        .model_name("dup")
        .parent_handle(ParentHandle::new("mllibdev"))
        .registry(Arc::<InMemoryRegistry>::clone(&registry))
        .operations(table)
        .build();

    let err = second.create().expect_err("重名登记应失败");
    assert_eq!(err.code(), "ml.registration_failure");
    assert_eq!(second.state(), LifecycleState::Unknown);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0, "登记失败时不应调用 create 钩子");
}

#[test]
fn init_publishes_default_options_and_advances_state() {
    let registry = Arc::new(InMemoryRegistry::new());
    let model = generic_model(&registry, "init");
    model.create().expect("create");

    model
        .init(ModelOptions::new(ModelOptions::NEVER_WAKE))
        .expect("通用 init");
    assert_eq!(model.state(), LifecycleState::Initialized);
    assert_eq!(
        model.options().get().map(ModelOptions::sleep_timeout),
        Some(ModelOptions::DEFAULT_SLEEP_TIMEOUT),
        "通用 init 写入库默认休眠间隔"
    );

    model
        .re_init(ModelOptions::new(Duration::from_millis(5)))
        .expect("通用 re_init");
    assert_eq!(model.state(), LifecycleState::Initialized, "re_init 不改变阶段");
    assert_eq!(model.options_generation(), 2);
}

#[test]
fn failed_init_leaves_options_and_state_untouched() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&attempts);
    let table = OperationTable::builder()
        .on_init(move |_model, options| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                *options = options.with_sleep_timeout(Duration::from_millis(40));
                Ok(())
            } else {
                Err(ModelError::invalid_argument("sleep interval out of range"))
            }
        })
        .build();
    let model = Model::builder().operations(table).build();
    model.create().expect("create");
    model.init(ModelOptions::default()).expect("首次 init 成功");
    assert_start_declined(&model);

    let before = model.options_generation();
    let err = model
        .init(ModelOptions::default())
        .expect_err("第二次 init 钩子失败");
    assert_eq!(err, ModelError::invalid_argument("sleep interval out of range"));
    assert_eq!(model.options_generation(), before, "失败的 init 不发布");
    assert_eq!(
        model.options().get().map(ModelOptions::sleep_timeout),
        Some(Duration::from_millis(40))
    );
    assert_eq!(model.state(), LifecycleState::Initialized);
}

fn assert_start_declined(model: &Model) {
    let before = model.state();
    let err = model
        .start(&RunConfig::default())
        .expect_err("无覆写的 start 应被拒绝");
    assert!(err.is_unsupported());
    assert_eq!(model.state(), before, "被拒绝的 start 不改变阶段");
}

#[test]
fn start_and_stop_hooks_drive_state() {
    let run_configs = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&run_configs);
    let table = OperationTable::builder()
        .on_start(move |_model, config| {
            observed.store(config.sleep_timeout.as_millis() as usize, Ordering::SeqCst);
            Ok(())
        })
        .on_stop(|_model| Ok(()))
        .build();
    let model = Model::builder().operations(table).build();
    model.create().expect("create");

    model
        .start(&RunConfig::new(Duration::from_millis(7)))
        .expect("start");
    assert_eq!(model.state(), LifecycleState::Started);
    assert_eq!(run_configs.load(Ordering::SeqCst), 7, "钩子收到运行配置");

    model.stop().expect("stop");
    assert_eq!(model.state(), LifecycleState::Stopped);
}

#[test]
fn destroy_is_idempotent_and_runs_hooks_once() {
    let registry = Arc::new(InMemoryRegistry::new());
    let destroy_calls = Arc::new(AtomicUsize::new(0));
    let dataset_teardowns = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&destroy_calls);
    let teardowns = Arc::clone(&dataset_teardowns);
    let table = OperationTable::builder()
        .on_destroy(move |_model| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .on_dataset_destroy(move |_dataset| {
            teardowns.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let model = Model::builder()
        .model_name("teardown")
        .registry(Arc::<InMemoryRegistry>::clone(&registry))
        .operations(table)
        .build();
    model.create().expect("create");
    model.init(ModelOptions::default()).expect("init");
    model
        .get_dataset(&RequestConfig::empty(), &UserRequest::empty())
        .expect("get_dataset");

    model.destroy();
    assert_eq!(model.state(), LifecycleState::Terminal);
    assert!(model.options().is_empty());
    assert!(model.dataset().is_empty());
    assert!(registry.is_empty(), "destroy 注销登记");
    assert_eq!(destroy_calls.load(Ordering::SeqCst), 1);
    assert_eq!(dataset_teardowns.load(Ordering::SeqCst), 1, "回收的数据集交给拆卸钩子");

    model.destroy();
    assert_eq!(destroy_calls.load(Ordering::SeqCst), 1, "第二次 destroy 不调用钩子");
    assert_eq!(dataset_teardowns.load(Ordering::SeqCst), 1);
    assert_eq!(model.state(), LifecycleState::Terminal);
}

#[traced_test]
#[test]
fn destroy_hook_reentering_the_model_fails_fast() {
    let observed = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen = Arc::clone(&observed);
    let table = OperationTable::builder()
        .on_stop(|_model| Ok(()))
        .on_destroy(move |model| {
            let mut seen = seen.lock();
            seen.push(model.stop().map_err(|err| err.code()));
            seen.push(model.create().map_err(|err| err.code()));
            seen.push(model.discard_dataset().map_err(|err| err.code()));
        })
        .build();
    let model = Model::builder().model_name("reentrant").operations(table).build();
    model.create().expect("create");

    model.destroy();
    assert_eq!(model.state(), LifecycleState::Terminal, "destroy 照常完成");
    assert_eq!(
        *observed.lock(),
        vec![
            Err("ml.unsupported"),
            Err("ml.unsupported"),
            Err("ml.unsupported")
        ],
        "拆卸期间的重入调用立即返回 Unsupported"
    );
    assert!(logs_contain("destroy in progress"));
}

#[test]
fn generic_destroy_resets_parent_and_mode() {
    let registry = Arc::new(InMemoryRegistry::new());
    let model = generic_model(&registry, "reset");
    model.create().expect("create");
    model.set_mode(Mode::Learning);

    model.destroy();
    assert_eq!(model.mode(), Mode::Unknown);
    assert_eq!(model.parent().kind(), SubsystemKind::Unknown);
}

#[test]
fn terminal_model_rejects_everything_but_destroy() {
    let model = Model::builder().build();
    model.create().expect("create");
    model.destroy();

    assert!(model.create().expect_err("拆卸后 create").is_unsupported());
    assert!(model.init(ModelOptions::default()).expect_err("拆卸后 init").is_unsupported());
    assert!(model
        .get_dataset(&RequestConfig::empty(), &UserRequest::empty())
        .expect_err("拆卸后 get_dataset")
        .is_unsupported());
    assert!(model.discard_dataset().expect_err("拆卸后 discard").is_unsupported());
    assert!(model.refresh_system_state().expect_err("拆卸后刷新").is_unsupported());
}

#[test]
fn destroy_of_never_created_model_runs_no_hooks() {
    let destroy_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&destroy_calls);
    let table = OperationTable::builder()
        .on_destroy(move |_model| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let model = Model::builder().operations(table).build();

    model.destroy();
    assert_eq!(model.state(), LifecycleState::Terminal);
    assert_eq!(destroy_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn destroy_waits_for_in_flight_operation() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let table = {
        let entered = Arc::clone(&entered);
        let release = Arc::clone(&release);
        OperationTable::builder()
            .on_start(move |_model, _config| {
                entered.wait();
                release.wait();
                Ok(())
            })
            .build()
    };
    let model = Arc::new(Model::builder().operations(table).build());
    model.create().expect("create");

    let starter = {
        let model = Arc::clone(&model);
        thread::spawn(move || model.start(&RunConfig::default()))
    };
    entered.wait();

    let destroyed = Arc::new(AtomicBool::new(false));
    let destroyer = {
        let model = Arc::clone(&model);
        let destroyed = Arc::clone(&destroyed);
        thread::spawn(move || {
            model.destroy();
            destroyed.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!destroyed.load(Ordering::SeqCst), "destroy 必须等待在途操作完成");

    release.wait();
    starter
        .join()
        .expect("start 线程不应 panic")
        .expect("在途 start 正常完成");
    destroyer.join().expect("destroy 线程不应 panic");
    assert!(destroyed.load(Ordering::SeqCst));
    assert_eq!(model.state(), LifecycleState::Terminal);
}

#[test]
fn mode_axis_is_independent_of_lifecycle() {
    let model = Model::builder().build();
    model.set_mode(Mode::Recommendation);
    assert_eq!(model.mode(), Mode::Recommendation);
    assert_eq!(model.state(), LifecycleState::Unknown);
    model.create().expect("create");
    assert_eq!(model.mode(), Mode::Emergency, "通用 create 切换到应急模式");
    model.set_mode(Mode::Collaboration);
    assert_eq!(model.state(), LifecycleState::Created);
}

#[test]
#[traced_test]
fn declined_operation_is_logged() {
    let model = Model::builder().model_name("quiet").build();
    model.create().expect("create");
    let err = model.correct_system_state().expect_err("通用表拒绝该扩展点");
    assert_eq!(
        err.to_string(),
        "operation `correct_system_state` is not supported"
    );
    assert!(logs_contain("operation declined"));
}
