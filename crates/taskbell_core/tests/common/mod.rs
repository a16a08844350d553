#![allow(dead_code)]

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use std::collections::HashSet;
use std::sync::Mutex;
use taskbell_core::{
    DisplayError, NotificationPayload, NotificationPlatform, PeriodicWakeRegistration,
    PermissionState, PlatformCapability, PlatformError,
};

/// In-process platform that records every call.
pub struct FakePlatform {
    capabilities: HashSet<PlatformCapability>,
    permission: Mutex<PermissionState>,
    prompt_answer: PermissionState,
    failing_tags: Mutex<HashSet<String>>,
    shown: Mutex<Vec<NotificationPayload>>,
    prompts: Mutex<usize>,
    runtime_registrations: Mutex<usize>,
    periodic_wakes: Mutex<Vec<String>>,
}

impl FakePlatform {
    /// Every capability present, permission not asked yet, prompt grants.
    pub fn full() -> Self {
        Self::with_capabilities(&[
            PlatformCapability::Notification,
            PlatformCapability::BackgroundRuntime,
            PlatformCapability::PeriodicWake,
        ])
    }

    pub fn with_capabilities(capabilities: &[PlatformCapability]) -> Self {
        Self {
            capabilities: capabilities.iter().copied().collect(),
            permission: Mutex::new(PermissionState::Default),
            prompt_answer: PermissionState::Granted,
            failing_tags: Mutex::new(HashSet::new()),
            shown: Mutex::new(Vec::new()),
            prompts: Mutex::new(0),
            runtime_registrations: Mutex::new(0),
            periodic_wakes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_permission(self, permission: PermissionState) -> Self {
        *self.permission.lock().unwrap() = permission;
        self
    }

    pub fn answering_prompt_with(mut self, answer: PermissionState) -> Self {
        self.prompt_answer = answer;
        self
    }

    pub fn fail_tag(&self, tag: &str) {
        self.failing_tags.lock().unwrap().insert(tag.to_string());
    }

    pub fn shown(&self) -> Vec<NotificationPayload> {
        self.shown.lock().unwrap().clone()
    }

    pub fn shown_tags(&self) -> Vec<String> {
        self.shown().into_iter().map(|payload| payload.tag).collect()
    }

    pub fn prompts(&self) -> usize {
        *self.prompts.lock().unwrap()
    }

    pub fn runtime_registrations(&self) -> usize {
        *self.runtime_registrations.lock().unwrap()
    }

    pub fn periodic_wakes(&self) -> Vec<String> {
        self.periodic_wakes.lock().unwrap().clone()
    }
}

impl NotificationPlatform for FakePlatform {
    fn supports(&self, capability: PlatformCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    fn permission_state(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    fn request_permission(&self) -> PermissionState {
        *self.prompts.lock().unwrap() += 1;
        let mut permission = self.permission.lock().unwrap();
        *permission = self.prompt_answer;
        *permission
    }

    fn show(&self, payload: &NotificationPayload) -> Result<(), DisplayError> {
        if *self.permission.lock().unwrap() != PermissionState::Granted {
            return Err(DisplayError::PermissionNotGranted);
        }
        if self.failing_tags.lock().unwrap().contains(&payload.tag) {
            return Err(DisplayError::Rejected(format!("tag {} blocked", payload.tag)));
        }
        self.shown.lock().unwrap().push(payload.clone());
        Ok(())
    }

    fn register_runtime(&self) -> Result<(), PlatformError> {
        *self.runtime_registrations.lock().unwrap() += 1;
        Ok(())
    }

    fn register_periodic_wake(
        &self,
        registration: &PeriodicWakeRegistration,
    ) -> Result<(), PlatformError> {
        self.periodic_wakes
            .lock()
            .unwrap()
            .push(registration.tag.clone());
        Ok(())
    }

    fn unregister_periodic_wake(&self, tag: &str) -> Result<(), PlatformError> {
        self.periodic_wakes.lock().unwrap().retain(|t| t != tag);
        Ok(())
    }
}

/// Local wall-clock instant; panics on DST gaps, so tests stick to mid-day.
pub fn local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Local> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap();
    Local.from_local_datetime(&naive).earliest().unwrap()
}
