//! Scripted `RemoteClient` for driving the coordinators without a network.

use std::cell::RefCell;
use std::collections::VecDeque;

use fedicache::core::{Cursor, EntityId, EntityType, ListKey, RawEntity, decode_entity};
use fedicache::{ApiError, MutateAction, PageResponse, RemoteClient};
use serde_json::Value;

/// One scripted list response.
pub struct ScriptedPage {
    pub typ: EntityType,
    pub items: Vec<Value>,
    pub next: Option<&'static str>,
}

impl ScriptedPage {
    pub fn statuses(items: Vec<Value>, next: Option<&'static str>) -> Self {
        Self {
            typ: EntityType::Status,
            items,
            next,
        }
    }
}

/// Replays scripted responses in order and records what was asked.
#[derive(Default)]
pub struct ScriptedRemote {
    pages: RefCell<VecDeque<Result<ScriptedPage, u16>>>,
    mutations: RefCell<VecDeque<Result<Option<(EntityType, Value)>, u16>>>,
    pub seen_cursors: RefCell<Vec<Option<String>>>,
    pub seen_actions: RefCell<Vec<MutateAction>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, page: ScriptedPage) {
        self.pages.borrow_mut().push_back(Ok(page));
    }

    pub fn push_page_error(&self, status: u16) {
        self.pages.borrow_mut().push_back(Err(status));
    }

    pub fn push_mutation(&self, response: Option<(EntityType, Value)>) {
        self.mutations.borrow_mut().push_back(Ok(response));
    }

    pub fn push_mutation_error(&self, status: u16) {
        self.mutations.borrow_mut().push_back(Err(status));
    }

    pub fn list_calls(&self) -> usize {
        self.seen_cursors.borrow().len()
    }
}

impl RemoteClient for ScriptedRemote {
    fn fetch_entity(&self, _typ: EntityType, _id: &EntityId) -> Result<RawEntity, ApiError> {
        unimplemented!("scripted remote serves lists and mutations only")
    }

    fn fetch_list(
        &self,
        _typ: EntityType,
        _list: &ListKey,
        cursor: Option<&Cursor>,
    ) -> Result<PageResponse, ApiError> {
        self.seen_cursors
            .borrow_mut()
            .push(cursor.map(|c| c.as_str().to_string()));
        let scripted = self
            .pages
            .borrow_mut()
            .pop_front()
            .expect("test script exhausted");
        match scripted {
            Ok(page) => Ok(PageResponse {
                items: page
                    .items
                    .iter()
                    .map(|v| decode_entity(page.typ, v).expect("scripted payload decodes"))
                    .collect(),
                next: page.next.map(Cursor::new),
                prev: None,
                total_count: None,
            }),
            Err(status) => Err(ApiError::rejected(status)),
        }
    }

    fn mutate(&self, action: &MutateAction) -> Result<Option<RawEntity>, ApiError> {
        self.seen_actions.borrow_mut().push(action.clone());
        let scripted = self
            .mutations
            .borrow_mut()
            .pop_front()
            .expect("test script exhausted");
        match scripted {
            Ok(Some((typ, v))) => {
                Ok(Some(decode_entity(typ, &v).expect("scripted payload decodes")))
            }
            Ok(None) => Ok(None),
            Err(status) => Err(ApiError::rejected(status)),
        }
    }
}
