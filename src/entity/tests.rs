use super::*;
use crate::config::{ConsoleConfig, TableDefaults};
use crate::page::{Direction, EntityPageLink, PageData, Timewindow, HOUR, MAX_SAFE_PAGE_SIZE};
use crate::services::{DialogService, MapTranslator};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Device {
    id: String,
    name: String,
    created_time: i64,
    labels: String,
}

impl BaseData for Device {
    fn id(&self) -> &str {
        &self.id
    }
}

fn device(id: &str, name: &str, created_time: i64) -> Device {
    Device {
        id: id.into(),
        name: name.into(),
        created_time,
        labels: "indoor,critical".into(),
    }
}

fn devices() -> Vec<Device> {
    vec![
        device("A", "alpha", 3000),
        device("B", "beta", 2000),
        device("C", "gamma", 1000),
    ]
}

#[derive(Default)]
struct FakeRepository {
    devices: Mutex<Vec<Device>>,
    fetches: AtomicUsize,
    loads: AtomicUsize,
    links: Mutex<Vec<EntityPageLink>>,
    fetch_delays_ms: Mutex<VecDeque<u64>>,
    fail_fetch: AtomicBool,
    failing_deletes: Mutex<HashSet<String>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeRepository {
    fn with(devices: Vec<Device>) -> Arc<Self> {
        Arc::new(Self {
            devices: Mutex::new(devices),
            ..Self::default()
        })
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn last_link(&self) -> EntityPageLink {
        self.links
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .expect("at least one fetch")
    }
}

#[async_trait]
impl EntityRepository<Device> for FakeRepository {
    async fn fetch_entities(&self, page_link: &EntityPageLink) -> Result<PageData<Device>, RepositoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.links.lock().expect("lock").push(page_link.clone());
        let delay = self.fetch_delays_ms.lock().expect("lock").pop_front();
        if let Some(ms) = delay {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("backend down".into()));
        }
        let items = self.devices.lock().expect("lock").clone();
        Ok(page_link.page_data(
            items,
            |d: &Device| d.name.clone(),
            |a: &Device, b: &Device, property: &str| match property {
                "name" => a.name.cmp(&b.name),
                _ => a.created_time.cmp(&b.created_time),
            },
        ))
    }

    async fn delete_entity(&self, id: &str) -> Result<(), RepositoryError> {
        if self.failing_deletes.lock().expect("lock").contains(id) {
            return Err(RepositoryError::Request(format!("cannot delete {id}")));
        }
        self.devices.lock().expect("lock").retain(|d| d.id != id);
        self.deleted.lock().expect("lock").push(id.to_string());
        Ok(())
    }

    async fn load_entity(&self, id: &str) -> Result<Device, RepositoryError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.devices
            .lock()
            .expect("lock")
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn save_entity(&self, entity: Device, _original: Option<&Device>) -> Result<Device, RepositoryError> {
        let mut devices = self.devices.lock().expect("lock");
        if let Some(slot) = devices.iter_mut().find(|d| d.id == entity.id) {
            *slot = entity.clone();
        }
        Ok(entity)
    }

    async fn add_entity(&self) -> Result<Option<Device>, RepositoryError> {
        let created = device("D", "delta", 4000);
        self.devices.lock().expect("lock").push(created.clone());
        Ok(Some(created))
    }
}

struct ScriptedDialogs {
    answer: bool,
    confirms: AtomicUsize,
}

impl ScriptedDialogs {
    fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            confirms: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl DialogService for ScriptedDialogs {
    async fn confirm(&self, _: &str, _: &str, _: &str, _: &str, _: bool) -> bool {
        self.confirms.fetch_add(1, Ordering::SeqCst);
        self.answer
    }

    async fn alert(&self, _: &str, _: &str, _: &str) {}

    async fn show_content(&self, _: &str, _: &str) {}
}

#[derive(Default)]
struct RecordingHooks {
    deleted: Mutex<Vec<Vec<String>>>,
    updated: Mutex<Vec<String>>,
    added: Mutex<Vec<String>>,
    handles_row_click: bool,
}

impl EntityTableHooks<Device> for RecordingHooks {
    fn handle_row_click(&self, _entity: &Device) -> bool {
        self.handles_row_click
    }

    fn entity_added(&self, entity: &Device) {
        self.added.lock().expect("lock").push(entity.id.clone());
    }

    fn entity_updated(&self, entity: &Device) {
        self.updated.lock().expect("lock").push(entity.id.clone());
    }

    fn entities_deleted(&self, ids: &[String]) {
        self.deleted.lock().expect("lock").push(ids.to_vec());
    }
}

struct Fixture {
    repository: Arc<FakeRepository>,
    hooks: Arc<RecordingHooks>,
    dialogs: Arc<ScriptedDialogs>,
    content_calls: Arc<AtomicUsize>,
    config: Arc<EntityTableConfig<Device>>,
    table: Arc<EntitiesTable<Device>>,
}

fn build_config(
    repository: Arc<FakeRepository>,
    hooks: Arc<RecordingHooks>,
    settings: TableSettings,
    content_calls: Arc<AtomicUsize>,
) -> Arc<EntityTableConfig<Device>> {
    EntityTableConfig::<Device>::builder(repository)
        .settings(settings)
        .hooks(hooks)
        .column(DateColumn::new("createdTime", "Created time", "150px"))
        .column(ContentColumn::new("name", "Name", "0px").content(move |d: &Device, _| {
            content_calls.fetch_add(1, Ordering::SeqCst);
            format!("<b>{}</b>", d.name)
        }))
        .column(ChipsColumn::new("labels", "Labels", "0px"))
        .column(ActionColumn::new(
            "open",
            "",
            CellActionDescriptor::new("Open", "open_in_new", CellActionHandler::custom(|_d: Device| async {})),
            "40px",
        ))
        .cell_action(CellActionDescriptor::new(
            "Copy id",
            "content_copy",
            CellActionHandler::custom(|_d: Device| async {}),
        ))
        .build()
}

async fn fixture_with(settings: TableSettings, confirm: bool) -> Fixture {
    let repository = FakeRepository::with(devices());
    let hooks = Arc::new(RecordingHooks::default());
    let dialogs = ScriptedDialogs::answering(confirm);
    let content_calls = Arc::new(AtomicUsize::new(0));
    let config = build_config(repository.clone(), hooks.clone(), settings, content_calls.clone());
    let table = EntitiesTable::new(
        Arc::new(MapTranslator::english()),
        dialogs.clone(),
        TableDefaults::default(),
    );
    table.init(config.clone()).await;
    Fixture {
        repository,
        hooks,
        dialogs,
        content_calls,
        config,
        table,
    }
}

async fn fixture() -> Fixture {
    fixture_with(TableSettings::default(), true).await
}

const NAME_COL: usize = 1;

#[tokio::test]
async fn init_loads_first_page_with_default_sort() {
    let f = fixture().await;

    assert_eq!(f.repository.fetches(), 1);
    assert_eq!(
        f.repository.last_link().to_query(),
        "?pageSize=10&page=0&sortProperty=createdTime&sortOrder=DESC"
    );
    let ids: Vec<String> = f
        .table
        .data_source()
        .expect("initialized")
        .entities()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn init_twice_derives_identical_state() {
    let f = fixture().await;
    let first = f.table.snapshot().expect("snapshot");

    f.table.init(f.config.clone()).await;
    let second = f.table.snapshot().expect("snapshot");

    assert_eq!(first, second);
    assert_eq!(second.cell_actions, vec!["Copy id".to_string(), "Delete".to_string()]);
    assert_eq!(second.group_actions, vec!["Delete".to_string()]);
    assert_eq!(
        second.displayed_columns,
        vec!["select", "createdTime", "name", "labels", "open", "actions"]
    );
    assert_eq!(second.page_size_options, vec![10, 20, 30]);
}

#[tokio::test]
async fn selection_requires_an_enabled_group_action() {
    let settings = TableSettings {
        entities_delete_enabled: false,
        ..TableSettings::default()
    };
    let f = fixture_with(settings, true).await;

    assert!(!f.table.selection_enabled());
    assert_eq!(f.table.displayed_columns().first().map(String::as_str), Some("createdTime"));
    assert_eq!(f.table.actions().expect("actions").cell.len(), 1);
}

#[tokio::test]
async fn hidden_pagination_requests_everything() {
    let settings = TableSettings {
        display_pagination: false,
        ..TableSettings::default()
    };
    let f = fixture_with(settings, true).await;

    assert_eq!(f.repository.last_link().page_size, MAX_SAFE_PAGE_SIZE);

    let reloaded = f
        .table
        .handle_event(TableEvent::Page {
            page_index: 3,
            page_size: 10,
        })
        .await
        .expect("event");
    assert!(reloaded.is_none());
    assert_eq!(f.repository.fetches(), 1);
}

#[tokio::test]
async fn sort_change_resets_page_and_reloads() {
    let f = fixture().await;
    f.table
        .handle_event(TableEvent::Page {
            page_index: 2,
            page_size: 20,
        })
        .await
        .expect("page event");
    assert_eq!(f.repository.last_link().page, 2);

    f.table
        .handle_event(TableEvent::Sort {
            active: Some("name".into()),
            direction: Direction::Asc,
        })
        .await
        .expect("sort event");

    let link = f.repository.last_link();
    assert_eq!(link.page, 0);
    assert_eq!(link.page_size, 20);
    assert_eq!(
        link.to_query(),
        "?pageSize=20&page=0&sortProperty=name&sortOrder=ASC"
    );
    assert_eq!(f.repository.fetches(), 3);
}

#[tokio::test]
async fn time_scoped_table_recomputes_bounds() {
    let settings = TableSettings {
        use_time_page_link: true,
        default_timewindow: crate::page::history_interval(HOUR),
        ..TableSettings::default()
    };
    let f = fixture_with(settings, true).await;

    let link = f.repository.last_link();
    let time = link.as_time().expect("time page link");
    let (start, end) = (time.start_time.expect("start"), time.end_time.expect("end"));
    assert_eq!(end - start, HOUR);

    f.table
        .on_timewindow_change(Timewindow::for_all_time())
        .await
        .expect("timewindow");
    let time = f.repository.last_link();
    let time = time.as_time().expect("time page link");
    assert_eq!((time.start_time, time.end_time), (None, None));
    assert!(!time.to_query().contains("startTime"));
}

#[tokio::test]
async fn bulk_delete_reports_only_successes_and_reloads_once() {
    let f = fixture().await;
    f.repository
        .failing_deletes
        .lock()
        .expect("lock")
        .insert("B".into());
    let data_source = f.table.data_source().expect("initialized");
    data_source.master_toggle();
    assert_eq!(data_source.selected_entities().len(), 3);
    let fetches_before = f.repository.fetches();

    let delete_index = f.table.actions().expect("actions").group.len() - 1;
    f.table
        .invoke_group_action(delete_index)
        .await
        .expect("group delete");

    assert_eq!(
        *f.hooks.deleted.lock().expect("lock"),
        vec![vec!["A".to_string(), "C".to_string()]]
    );
    assert_eq!(f.repository.fetches(), fetches_before + 1);
    assert_eq!(f.dialogs.confirms.load(Ordering::SeqCst), 1);
    let remaining: Vec<String> = data_source.entities().into_iter().map(|d| d.id).collect();
    assert_eq!(remaining, vec!["B"]);
}

#[tokio::test]
async fn group_delete_on_empty_selection_is_disabled() {
    let f = fixture().await;
    let delete_index = f.table.actions().expect("actions").group.len() - 1;

    assert!(!f.table.group_action_enabled(delete_index));
    let err = f
        .table
        .invoke_group_action(delete_index)
        .await
        .expect_err("disabled");
    assert!(matches!(err, TableError::ActionDisabled(_)));
    assert_eq!(f.dialogs.confirms.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn custom_group_action_receives_selection() {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let repository = FakeRepository::with(devices());
    let config = EntityTableConfig::builder(repository as Arc<dyn EntityRepository<Device>>)
        .column(ContentColumn::new("name", "Name", "0px"))
        .group_action(GroupActionDescriptor::new(
            "Export",
            "download",
            GroupActionHandler::custom(move |selection: Vec<Device>| {
                let sink = sink.clone();
                async move {
                    sink.lock()
                        .expect("lock")
                        .extend(selection.into_iter().map(|d| d.id));
                }
            }),
        ))
        .build();
    let table = EntitiesTable::new(
        Arc::new(MapTranslator::english()),
        ScriptedDialogs::answering(true),
        TableDefaults::default(),
    );
    table.init(config).await;

    let data_source = table.data_source().expect("initialized");
    let second = data_source.entity_at(1).expect("row 1");
    assert!(data_source.toggle_selection(&second));
    table.invoke_group_action(0).await.expect("export");

    assert_eq!(*received.lock().expect("lock"), vec!["B".to_string()]);
}

#[tokio::test]
async fn declined_delete_changes_nothing() {
    let f = fixture_with(TableSettings::default(), false).await;
    let entity = devices().remove(0);

    let deleted = f.table.delete_entity(&entity).await.expect("delete");

    assert!(!deleted);
    assert!(f.repository.deleted.lock().expect("lock").is_empty());
    assert_eq!(f.repository.fetches(), 1);
    assert!(f.hooks.deleted.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn delete_cell_action_deletes_and_reloads() {
    let f = fixture().await;
    let delete_index = f.table.actions().expect("actions").cell.len() - 1;

    f.table
        .invoke_cell_action(delete_index, devices().remove(1))
        .await
        .expect("cell delete");

    assert_eq!(*f.repository.deleted.lock().expect("lock"), vec!["B".to_string()]);
    assert_eq!(*f.hooks.deleted.lock().expect("lock"), vec![vec!["B".to_string()]]);
    assert_eq!(f.repository.fetches(), 2);
}

#[tokio::test]
async fn single_delete_failure_propagates() {
    let f = fixture().await;
    f.repository
        .failing_deletes
        .lock()
        .expect("lock")
        .insert("A".into());

    let err = f
        .table
        .delete_entity(&devices().remove(0))
        .await
        .expect_err("repository failure");
    assert!(matches!(err, TableError::Repository(RepositoryError::Request(_))));
    assert_eq!(f.repository.fetches(), 1);
}

#[tokio::test]
async fn entity_action_routes_delete() {
    let f = fixture().await;
    let handled = f
        .table
        .on_entity_action(EntityAction {
            action: "delete".into(),
            entity: devices().remove(2),
        })
        .await
        .expect("action");
    assert!(handled);
    assert_eq!(*f.repository.deleted.lock().expect("lock"), vec!["C".to_string()]);

    let ignored = f
        .table
        .on_entity_action(EntityAction {
            action: "archive".into(),
            entity: devices().remove(0),
        })
        .await
        .expect("action");
    assert!(!ignored);
}

#[tokio::test]
async fn cell_cache_recomputes_only_invalidated_cell() {
    let f = fixture().await;
    let data_source = f.table.data_source().expect("initialized");
    let rows = data_source.entities();

    for (row, entity) in rows.iter().enumerate() {
        f.table.cell_content(entity, NAME_COL, row);
    }
    for (row, entity) in rows.iter().enumerate() {
        f.table.cell_content(entity, NAME_COL, row);
    }
    assert_eq!(f.content_calls.load(Ordering::SeqCst), 3);

    let mut renamed = rows[0].clone();
    renamed.name = "omega".into();
    assert!(data_source.replace_entity(0, renamed.clone(), &[NAME_COL]));

    assert_eq!(f.table.cell_content(&renamed, NAME_COL, 0).as_str(), "<b>omega</b>");
    assert_eq!(f.table.cell_content(&rows[1], NAME_COL, 1).as_str(), "<b>beta</b>");
    assert_eq!(f.content_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn page_reload_clears_the_cache() {
    let f = fixture().await;
    let entity = devices().remove(0);
    f.table.cell_content(&entity, NAME_COL, 0);
    f.table.update_data(true).await.expect("reload");
    f.table.cell_content(&entity, NAME_COL, 0);

    assert_eq!(f.content_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn columns_update_drops_cache_and_displayed_columns() {
    let f = fixture().await;
    let entity = devices().remove(0);
    f.table.cell_content(&entity, NAME_COL, 0);

    let mut columns = f.config.columns();
    columns.remove(0);
    f.config.set_columns(columns);
    f.table.columns_updated(true).expect("columns");

    assert_eq!(
        f.table.displayed_columns(),
        vec!["select", "name", "labels", "open", "actions"]
    );
    assert!(f.table.data_source().expect("initialized").is_empty());
    f.table.cell_content(&entity, 0, 0);
    assert_eq!(f.content_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn render_dispatches_on_column_variant() {
    let f = fixture().await;
    let rows = f.table.render_rows();
    assert_eq!(rows.len(), 3);

    match &rows[0][0] {
        RenderedCell::Content { html, style, .. } => {
            assert_eq!(html.as_str(), "1970-01-01 00:00:03");
            assert_eq!(style.get("max-width").map(String::as_str), Some("150px"));
        }
        other => panic!("unexpected {other:?}"),
    }
    match &rows[0][2] {
        RenderedCell::Chips { chips, .. } => {
            let values: Vec<&str> = chips.iter().map(|c| c.value.as_str()).collect();
            assert_eq!(values, vec!["indoor", "critical"]);
        }
        other => panic!("unexpected {other:?}"),
    }
    match &rows[0][3] {
        RenderedCell::Action { name, enabled, .. } => {
            assert_eq!(name, "Open");
            assert!(enabled);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(f.table.cell_content(&devices()[0], 3, 0), SafeHtml::default());
    assert_eq!(
        f.table.header_cell_style(0).get("min-width").map(String::as_str),
        Some("150px")
    );
}

#[tokio::test(start_paused = true)]
async fn same_trimmed_search_reloads_once() {
    let f = fixture().await;

    f.table.text_search_changed("sensor").expect("search");
    tokio::time::sleep(Duration::from_millis(50)).await;
    f.table.text_search_changed(" sensor ").expect("search");
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(f.repository.fetches(), 2);
    assert_eq!(f.repository.last_link().text_search.as_deref(), Some("sensor"));

    f.table.text_search_changed("sensor  ").expect("search");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(f.repository.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn exit_filter_mode_clears_search() {
    let f = fixture().await;
    f.table.enter_filter_mode().expect("filter mode");
    f.table.text_search_changed("alp").expect("search");
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(f.table.data_source().expect("initialized").entities().len(), 1);

    f.table.exit_filter_mode().expect("exit");
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(!f.table.text_search_mode());
    assert_eq!(f.repository.last_link().text_search, None);
    assert_eq!(f.table.data_source().expect("initialized").entities().len(), 3);
}

#[tokio::test]
async fn reset_sort_and_filter_restores_defaults() {
    let f = fixture().await;
    f.table
        .handle_event(TableEvent::Sort {
            active: Some("name".into()),
            direction: Direction::Asc,
        })
        .await
        .expect("sort");

    f.table
        .reset_sort_and_filter(true, false)
        .await
        .expect("reset");

    let sort = f.table.sort().expect("sort");
    assert_eq!(sort.active.as_deref(), Some("createdTime"));
    assert_eq!(sort.direction, Direction::Desc);
    assert_eq!(
        f.repository.last_link().to_query(),
        "?pageSize=10&page=0&sortProperty=createdTime&sortOrder=DESC"
    );
}

#[tokio::test]
async fn stale_response_is_discarded() {
    let f = fixture().await;
    let data_source = f.table.data_source().expect("initialized");
    f.repository
        .fetch_delays_ms
        .lock()
        .expect("lock")
        .extend([100, 0]);

    let mut slow = f.table.page_link().expect("link");
    slow.text_search = Some("alpha".into());
    let mut fast = slow.clone();
    fast.text_search = Some("gamma".into());

    let (first, second) = tokio::join!(data_source.load_entities(slow), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        data_source.load_entities(fast).await
    });

    assert_eq!(first, LoadOutcome::Superseded);
    assert_eq!(second, LoadOutcome::Applied);
    let names: Vec<String> = data_source.entities().into_iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["gamma"]);
}

#[tokio::test]
async fn failed_fetch_shows_empty_page_with_error() {
    let f = fixture().await;
    f.repository.fail_fetch.store(true, Ordering::SeqCst);

    f.table.update_data(true).await.expect("reload");

    let data_source = f.table.data_source().expect("initialized");
    assert!(data_source.is_empty());
    assert!(matches!(
        data_source.last_error(),
        Some(RepositoryError::Unavailable(_))
    ));
}

#[tokio::test]
async fn row_click_toggles_details_unless_handled() {
    let f = fixture().await;
    let entity = devices().remove(0);
    let mut opened = f.table.details_panel_opened();

    f.table.on_row_click(&entity).expect("click");
    assert!(f.table.is_details_open());
    assert!(f.config.is_details_open());
    assert!(opened.has_changed().expect("sender alive"));
    assert!(*opened.borrow_and_update());

    f.table.on_row_click(&entity).expect("click");
    assert!(!f.table.is_details_open());

    let handled = Arc::new(RecordingHooks {
        handles_row_click: true,
        ..RecordingHooks::default()
    });
    let config = build_config(
        FakeRepository::with(devices()),
        handled,
        TableSettings::default(),
        Arc::new(AtomicUsize::new(0)),
    );
    f.table.init(config).await;
    f.table.on_row_click(&entity).expect("click");
    assert!(!f.table.is_details_open());
}

#[tokio::test]
async fn entity_update_keeps_details_open() {
    let f = fixture().await;
    let entity = devices().remove(0);
    f.table.toggle_entity_details(&entity);

    f.table.on_entity_updated(&entity).await.expect("updated");

    assert!(f.table.is_details_open());
    assert_eq!(*f.hooks.updated.lock().expect("lock"), vec!["A".to_string()]);
    assert_eq!(f.repository.fetches(), 2);

    f.table.update_data(true).await.expect("reload");
    assert!(!f.table.is_details_open());
}

#[tokio::test]
async fn add_entity_reloads_and_notifies() {
    let f = fixture().await;

    let added = f.table.add_entity().await.expect("add");

    assert_eq!(added.map(|d| d.id), Some("D".to_string()));
    assert_eq!(*f.hooks.added.lock().expect("lock"), vec!["D".to_string()]);
    assert_eq!(f.table.data_source().expect("initialized").total(), 4);
}

#[tokio::test]
async fn ownership_switch_routes_updates_to_details_page() {
    let f = fixture().await;
    let page = EntityDetailsPage::new();

    page.bind(f.config.clone(), "B").await;
    assert!(f.config.table().is_none());
    assert!(f.config.entity_details_page().is_some());
    assert_eq!(f.repository.loads.load(Ordering::SeqCst), 1);

    f.config.update_data(true).await.expect("routed");

    assert_eq!(f.repository.loads.load(Ordering::SeqCst), 2);
    assert_eq!(f.repository.fetches(), 1);
    assert!(!f.config.is_details_open());
    assert_eq!(page.entity().map(|d| d.name), Some("beta".to_string()));
}

#[tokio::test]
async fn details_page_saves_and_reports_update() {
    let f = fixture().await;
    let page = EntityDetailsPage::new();
    page.bind(f.config.clone(), "A").await;
    assert!(!page.is_readonly());

    let mut edited = page.entity().expect("loaded");
    edited.name = "alpha-2".into();
    let saved = page.save(edited).await.expect("saved");

    assert_eq!(saved.name, "alpha-2");
    assert_eq!(*f.hooks.updated.lock().expect("lock"), vec!["A".to_string()]);
}

#[tokio::test]
async fn dropped_view_leaves_config_inert() {
    let f = fixture().await;
    let Fixture { table, config, .. } = f;
    drop(table);

    let err = config.update_data(true).await.expect_err("detached");
    assert!(matches!(err, TableError::DetachedView));
    assert!(!config.is_details_open());

    config.release();
    config.update_data(true).await.expect("unbound is a no-op");
}

async fn fixture_from_console(console: &ConsoleConfig, settings: TableSettings) -> Fixture {
    let repository = FakeRepository::with(devices());
    let hooks = Arc::new(RecordingHooks::default());
    let dialogs = ScriptedDialogs::answering(true);
    let content_calls = Arc::new(AtomicUsize::new(0));
    let config = build_config(repository.clone(), hooks.clone(), settings, content_calls.clone());
    let table = EntitiesTable::new(
        Arc::new(MapTranslator::english()),
        dialogs.clone(),
        console.table.clone(),
    );
    table.init(config.clone()).await;
    Fixture {
        repository,
        hooks,
        dialogs,
        content_calls,
        config,
        table,
    }
}

#[tokio::test]
async fn console_page_size_reaches_first_fetch() {
    let console = ConsoleConfig::from_toml_str("[table]\ndefault_page_size = 25\n").expect("valid toml");
    let f = fixture_from_console(&console, TableSettings::from_console(&console)).await;

    let snapshot = f.table.snapshot().expect("snapshot");
    assert_eq!(snapshot.page_link.page_size, 25);
    assert_eq!(snapshot.paginator.page_size, 25);
    assert_eq!(snapshot.page_size_options, vec![25, 50, 75]);
    assert_eq!(f.repository.last_link().page_size, 25);
}

#[tokio::test]
async fn console_history_window_scopes_time_tables() {
    let console = ConsoleConfig::from_toml_str("[time]\ndefault_history_ms = 3600000\n").expect("valid toml");
    let settings = TableSettings {
        use_time_page_link: true,
        ..TableSettings::from_console(&console)
    };
    let f = fixture_from_console(&console, settings).await;

    let link = f.repository.last_link();
    let time = link.as_time().expect("time page link");
    assert_eq!(time.end_time.expect("end") - time.start_time.expect("start"), HOUR);
}

#[tokio::test]
async fn zero_page_size_is_clamped() {
    let settings = TableSettings {
        default_page_size: 0,
        ..TableSettings::default()
    };
    let f = fixture_with(settings, true).await;
    assert_eq!(f.repository.last_link().page_size, 1);

    f.table
        .handle_event(TableEvent::Page {
            page_index: 1,
            page_size: 0,
        })
        .await
        .expect("page event");

    let link = f.repository.last_link();
    assert_eq!((link.page, link.page_size), (1, 1));
    let data_source = f.table.data_source().expect("initialized");
    assert_eq!(data_source.total(), 3);
    assert_eq!(data_source.entities().len(), 1);
}

#[tokio::test]
async fn snapshot_exposes_settings_toggles() {
    let settings = TableSettings {
        table_title: "Devices".into(),
        actions_column_title: Some("Actions".into()),
        row_pointer: true,
        search_enabled: false,
        add_enabled: false,
        details_panel_enabled: false,
        for_all_time_enabled: true,
        page_mode: false,
        ..TableSettings::default()
    };
    let f = fixture_with(settings, true).await;

    let snapshot = f.table.snapshot().expect("snapshot");
    assert_eq!(snapshot.table_title, "Devices");
    assert_eq!(snapshot.actions_column_title.as_deref(), Some("Actions"));
    assert!(snapshot.row_pointer);
    assert!(!snapshot.search_enabled);
    assert!(!snapshot.add_enabled);
    assert!(!snapshot.details_panel_enabled);
    assert!(snapshot.for_all_time_enabled);
    assert!(!snapshot.page_mode);
}

#[tokio::test]
async fn disabled_add_does_not_reach_repository() {
    let settings = TableSettings {
        add_enabled: false,
        ..TableSettings::default()
    };
    let f = fixture_with(settings, true).await;

    let err = f.table.add_entity().await.expect_err("add disabled");

    assert!(matches!(err, TableError::ActionDisabled(_)));
    assert_eq!(f.repository.fetches(), 1);
    assert_eq!(f.repository.devices.lock().expect("lock").len(), 3);
    assert!(f.hooks.added.lock().expect("lock").is_empty());
}

#[tokio::test(start_paused = true)]
async fn disabled_search_rejects_filter_input() {
    let settings = TableSettings {
        search_enabled: false,
        ..TableSettings::default()
    };
    let f = fixture_with(settings, true).await;

    assert!(matches!(f.table.enter_filter_mode(), Err(TableError::ActionDisabled(_))));
    assert!(!f.table.text_search_mode());
    assert!(matches!(
        f.table.text_search_changed("alp"),
        Err(TableError::ActionDisabled(_))
    ));
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(f.repository.fetches(), 1);
    assert!(f.table.search_input().is_empty());
}

#[tokio::test]
async fn row_click_without_details_panel_keeps_it_closed() {
    let settings = TableSettings {
        details_panel_enabled: false,
        ..TableSettings::default()
    };
    let f = fixture_with(settings, true).await;

    f.table.on_row_click(&devices().remove(0)).expect("click");

    assert!(!f.table.is_details_open());
}

#[tokio::test]
async fn query_restores_paging_sort_and_search() {
    let f = fixture().await;

    let outcome = f
        .table
        .restore_query("?pageSize=20&page=0&textSearch=alp&sortProperty=name&sortOrder=ASC")
        .await
        .expect("restored");

    assert_eq!(outcome, LoadOutcome::Applied);
    assert_eq!(
        f.repository.last_link().to_query(),
        "?pageSize=20&page=0&textSearch=alp&sortProperty=name&sortOrder=ASC"
    );
    assert_eq!(f.table.search_input(), "alp");
    let sort = f.table.sort().expect("sort");
    assert_eq!(sort.active.as_deref(), Some("name"));
    assert_eq!(sort.direction, Direction::Asc);
    let names: Vec<String> = f
        .table
        .data_source()
        .expect("initialized")
        .entities()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["alpha"]);
}

#[tokio::test]
async fn malformed_query_is_rejected() {
    let f = fixture().await;

    let missing = f.table.restore_query("?page=0").await.expect_err("no page size");
    assert!(matches!(
        missing,
        TableError::InvalidQuery(crate::page::PageLinkError::MissingKey("pageSize"))
    ));

    let direction = f
        .table
        .restore_query("?pageSize=10&page=0&sortProperty=name&sortOrder=UP")
        .await
        .expect_err("bad direction");
    assert!(matches!(direction, TableError::InvalidQuery(_)));
    assert_eq!(f.repository.fetches(), 1);
}

#[tokio::test]
async fn query_restore_requires_page_mode() {
    let settings = TableSettings {
        page_mode: false,
        ..TableSettings::default()
    };
    let f = fixture_with(settings, true).await;

    let err = f
        .table
        .restore_query("?pageSize=20&page=0")
        .await
        .expect_err("not routed");

    assert!(matches!(err, TableError::ActionDisabled(_)));
    assert_eq!(f.repository.fetches(), 1);
}
