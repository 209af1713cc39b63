//! 数据集管线测试：缓存命中、失败不留痕、作废语义与发布前校验。

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use proptest::prelude::*;
use spark_ml::{
    DatasetKind, DatasetState, LifecycleState, Model, ModelError, ModelOptions, OperationTable,
    Portion, PublishedDataset, RequestConfig, UserRequest,
};
use tracing_test::traced_test;

const EXTRACT_OK: u8 = 0;
const EXTRACT_ERR: u8 = 1;
const EXTRACT_TAGGED_FAILURE: u8 = 2;
const EXTRACT_UNTOUCHED: u8 = 3;
const EXTRACT_OVERFLOW: u8 = 4;

/// 可编程的抽取桩：记录抽取与拆卸次数，按 `behaviour` 决定抽取结果。
#[derive(Clone, Default)]
struct ExtractionStub {
    behaviour: Arc<AtomicU8>,
    extractions: Arc<AtomicUsize>,
    teardowns: Arc<AtomicUsize>,
}

impl ExtractionStub {
    fn set(&self, behaviour: u8) {
        self.behaviour.store(behaviour, Ordering::SeqCst);
    }

    fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }

    fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    fn table(&self) -> OperationTable {
        let behaviour = Arc::clone(&self.behaviour);
        let extractions = Arc::clone(&self.extractions);
        let teardowns = Arc::clone(&self.teardowns);
        OperationTable::builder()
            .on_get_dataset(move |_model, _config, _request, dataset| {
                extractions.fetch_add(1, Ordering::SeqCst);
                match behaviour.load(Ordering::SeqCst) {
                    EXTRACT_ERR => return Err(ModelError::extraction_failure("stream read failed")),
                    EXTRACT_TAGGED_FAILURE => dataset.set_state(DatasetState::ExtractionFailure),
                    EXTRACT_UNTOUCHED => {}
                    EXTRACT_OVERFLOW => {
                        dataset.set_state(DatasetState::ExtractedPartially);
                        dataset.set_portion(Portion::new(u64::MAX, 16));
                    }
                    _ => {
                        dataset.set_kind(DatasetKind::Custom(7));
                        dataset.set_state(DatasetState::ExtractedCompletely);
                        dataset.set_allocated_size(4096);
                        dataset.set_portion(Portion::new(128, 512));
                    }
                }
                Ok(())
            })
            .on_dataset_destroy(move |_dataset| {
                teardowns.fetch_add(1, Ordering::SeqCst);
            })
            .build()
    }

    fn model(&self) -> Model {
        let model = Model::builder()
            .model_name("pipeline")
            .operations(self.table())
            .build();
        model.create().expect("create");
        model.init(ModelOptions::default()).expect("init");
        model
    }
}

fn fetch(model: &Model) -> Result<Arc<PublishedDataset>, ModelError> {
    model.get_dataset(&RequestConfig::empty(), &UserRequest::empty())
}

#[test]
fn cached_dataset_is_returned_without_extraction() {
    let stub = ExtractionStub::default();
    let model = stub.model();

    let first = fetch(&model).expect("首次抽取");
    let second = fetch(&model).expect("缓存命中");

    assert!(Arc::ptr_eq(&first, &second), "缓存命中返回同一对象");
    assert_eq!(stub.extractions(), 1, "第二次调用不做任何抽取");
    assert_eq!(model.dataset_generation(), 1);
    assert_eq!(first.portion(), Portion::new(128, 512));
}

#[test]
fn failed_extraction_keeps_previous_dataset() {
    let stub = ExtractionStub::default();
    let model = stub.model();
    fetch(&model).expect("首次抽取");
    model.discard_dataset().expect("作废");
    let before = model.dataset_snapshot().expect("已发布作废数据集");
    let generation = model.dataset_generation();
    let teardowns = stub.teardowns();

    stub.set(EXTRACT_ERR);
    let err = fetch(&model).expect_err("抽取失败应传播");
    assert_eq!(err, ModelError::extraction_failure("stream read failed"), "错误原样返回");

    let after = model.dataset_snapshot().expect("原数据集仍在");
    assert!(Arc::ptr_eq(&before, &after), "失败的抽取不替换已发布数据集");
    assert_eq!(model.dataset_generation(), generation);
    assert_eq!(stub.teardowns(), teardowns + 1, "未发布的新对象被拆卸");
}

#[test]
fn failed_extraction_on_empty_slot_leaves_it_empty() {
    let stub = ExtractionStub::default();
    stub.set(EXTRACT_ERR);
    let model = stub.model();

    assert!(fetch(&model).is_err());
    assert!(model.dataset().is_empty());
    assert_eq!(model.dataset_generation(), 0);
}

#[test]
fn invalid_extraction_results_are_never_published() {
    let stub = ExtractionStub::default();
    let model = stub.model();

    stub.set(EXTRACT_TAGGED_FAILURE);
    assert_eq!(
        fetch(&model).map(|_| ()).map_err(|err| err.code()),
        Err("ml.dataset.extraction_failure")
    );

    stub.set(EXTRACT_UNTOUCHED);
    assert_eq!(
        fetch(&model).map(|_| ()).map_err(|err| err.code()),
        Err("ml.dataset.corrupted"),
        "停留在 Allocated 的数据集视为损坏"
    );

    stub.set(EXTRACT_OVERFLOW);
    assert_eq!(
        fetch(&model).map(|_| ()).map_err(|err| err.code()),
        Err("ml.dataset.corrupted"),
        "越界窗口视为损坏"
    );

    assert!(model.dataset().is_empty(), "非法结果一律不发布");
    assert_eq!(stub.teardowns(), 3);
    assert_eq!(stub.extractions(), 3, "校验失败不自动重试");
}

#[test]
fn discard_without_dataset_yields_empty_obsolete() {
    let model = ExtractionStub::default().model();
    model.discard_dataset().expect("作废");

    let guard = model.dataset();
    let dataset = guard.get().expect("作废后总有数据集");
    assert_eq!(dataset.state(), DatasetState::Obsolete);
    assert_eq!(dataset.kind(), DatasetKind::Empty);
    assert_eq!(dataset.allocated_size(), 0);
    assert_eq!(dataset.portion(), Portion::EMPTY);
}

#[test]
fn discard_preserves_metadata_and_reclaims_previous() {
    let stub = ExtractionStub::default();
    let model = stub.model();
    fetch(&model).expect("抽取");

    model.discard_dataset().expect("作废");
    let dataset = model.dataset_snapshot().expect("已发布");
    assert_eq!(dataset.state(), DatasetState::Obsolete);
    assert_eq!(dataset.kind(), DatasetKind::Custom(7));
    assert_eq!(dataset.allocated_size(), 4096);
    assert_eq!(dataset.portion(), Portion::new(128, 512));
    assert_eq!(stub.teardowns(), 1, "被替换的数据集交给拆卸钩子");
}

#[test]
fn obsolete_dataset_triggers_fresh_extraction() {
    let stub = ExtractionStub::default();
    let model = stub.model();
    fetch(&model).expect("抽取");
    model.discard_dataset().expect("作废");

    let refreshed = fetch(&model).expect("重新抽取");
    assert_eq!(refreshed.state(), DatasetState::ExtractedCompletely);
    assert_eq!(stub.extractions(), 2);
    assert_eq!(stub.teardowns(), 2, "作废数据集在替换后被拆卸");
}

#[traced_test]
#[test]
fn held_datasets_are_torn_down_when_the_last_holder_releases() {
    let stub = ExtractionStub::default();
    let model = stub.model();

    let first = fetch(&model).expect("首次抽取");
    model.discard_dataset().expect("作废");
    assert_eq!(stub.teardowns(), 0, "调用方仍持有被替换的数据集");
    assert_eq!(first.state(), DatasetState::ExtractedCompletely, "持有者看到的内容不变");
    drop(first);
    assert_eq!(stub.teardowns(), 1, "最后一个持有者释放时拆卸");

    let second = fetch(&model).expect("重新抽取");
    assert_eq!(stub.teardowns(), 2, "作废替身在替换后被拆卸");
    model.destroy();
    assert_eq!(model.state(), LifecycleState::Terminal);
    assert_eq!(stub.teardowns(), 2, "destroy 不等待持有者");
    assert_eq!(second.portion(), Portion::new(128, 512));
    drop(second);
    assert_eq!(stub.teardowns(), 3, "每个发布过的数据集恰好拆卸一次");

    assert!(!logs_contain("grace period exhausted"));
}

#[test]
fn get_dataset_advances_live_model_to_running() {
    let stub = ExtractionStub::default();
    let model = stub.model();
    assert_eq!(model.state(), LifecycleState::Initialized);
    fetch(&model).expect("抽取");
    assert_eq!(model.state(), LifecycleState::Running);

    stub.set(EXTRACT_ERR);
    model.discard_dataset().expect("作废");
    assert!(fetch(&model).is_err());
    assert_eq!(model.state(), LifecycleState::Running, "失败不回退阶段");
}

#[test]
fn dataset_hooks_guard_allocation_and_init() {
    let teardowns = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&teardowns);
    let table = OperationTable::builder()
        .on_dataset_init(|_dataset| Err(ModelError::invalid_argument("dataset init rejected")))
        .on_dataset_destroy(move |_dataset| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let model = Model::builder().operations(table).build();
    model.create().expect("create");
    let err = fetch(&model).expect_err("init 钩子失败");
    assert_eq!(err, ModelError::invalid_argument("dataset init rejected"));
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    assert!(model.dataset().is_empty());

    let table = OperationTable::builder()
        .on_dataset_allocate(|_size| Err(ModelError::out_of_memory("dataset pool empty")))
        .build();
    let model = Model::builder().operations(table).build();
    model.create().expect("create");
    assert_eq!(
        model.discard_dataset().map_err(|err| err.code()),
        Err("ml.out_of_memory"),
        "作废替身分配失败时什么也不提交"
    );
    assert!(model.dataset().is_empty());
}

#[derive(Clone, Copy, Debug)]
enum PipelineOp {
    Fetch { succeed: bool },
    Discard,
}

fn pipeline_ops() -> impl Strategy<Value = Vec<PipelineOp>> {
    prop::collection::vec(
        prop_oneof![
            any::<bool>().prop_map(|succeed| PipelineOp::Fetch { succeed }),
            Just(PipelineOp::Discard),
        ],
        1..32,
    )
}

proptest! {
    /// 影子模型只记录已发布数据集的状态标签：抽取只在缓存未命中时发生，
    /// 失败从不改变影子状态，作废总是得到 `Obsolete`。
    #[test]
    fn prop_pipeline_matches_shadow_model(ops in pipeline_ops()) {
        let stub = ExtractionStub::default();
        let model = stub.model();
        let mut shadow: Option<DatasetState> = None;
        let mut expected_extractions = 0usize;

        for op in ops {
            match op {
                PipelineOp::Fetch { succeed } => {
                    stub.set(if succeed { EXTRACT_OK } else { EXTRACT_ERR });
                    let cached = shadow.is_some_and(DatasetState::is_reusable);
                    let outcome = fetch(&model);
                    if cached {
                        prop_assert!(outcome.is_ok(), "缓存命中不依赖抽取结果");
                    } else {
                        expected_extractions += 1;
                        if succeed {
                            prop_assert!(outcome.is_ok());
                            shadow = Some(DatasetState::ExtractedCompletely);
                        } else {
                            prop_assert!(outcome.is_err());
                        }
                    }
                }
                PipelineOp::Discard => {
                    model.discard_dataset().expect("作废不应失败");
                    shadow = Some(DatasetState::Obsolete);
                }
            }
            prop_assert_eq!(model.dataset().get().map(|dataset| dataset.state()), shadow);
            prop_assert_eq!(stub.extractions(), expected_extractions);
        }
    }
}
