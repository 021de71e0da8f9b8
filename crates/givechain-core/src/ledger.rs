use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::snapshot::LedgerSnapshot;
use crate::transaction::TransactionRecord;

pub type Address = String;
pub type CampaignId = String;
pub type RequestId = String;
pub type Amount = u64;

pub const EDU_SCALE: u64 = 100_000_000; // 1 EDU = 1e8 base units
pub const MS_PER_DAY: u64 = 86_400_000;

/// Approvals required before a withdrawal request settles. The
/// single-admin demo deployment uses one.
pub const DEFAULT_APPROVAL_THRESHOLD: u32 = 1;

/// Stored lifecycle state of a campaign.
///
/// ```text
/// active ──► completed   (automatic, derived from time/target)
/// active ──► paused      (explicit creator action)
/// active ──► cancelled   (explicit creator action)
/// ```
///
/// There is no path back to `active`. The stored value is not
/// authoritative over the derived completion check in
/// [`Campaign::is_completed`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignId,
    pub creator: Address,
    pub title: String,
    pub description: String,
    pub category: String,
    pub target_amount: Amount,
    pub min_donation: Amount,
    pub end_date_ms: u64,
    pub raised_amount: Amount,
    pub withdrawn_amount: Amount,
    pub donor_count: u64,
    pub status: CampaignStatus,
    pub created_at_ms: u64,
}

impl Campaign {
    /// Completion is evaluated at read time against the clock, never
    /// stored: a campaign is completed once its deadline passed or its
    /// target was reached.
    pub fn is_completed(&self, now_ms: u64) -> bool {
        now_ms >= self.end_date_ms || self.raised_amount >= self.target_amount
    }

    /// Stored status overlaid with the derived completion rule.
    pub fn effective_status(&self, now_ms: u64) -> CampaignStatus {
        match self.status {
            CampaignStatus::Active if self.is_completed(now_ms) => CampaignStatus::Completed,
            other => other,
        }
    }

    pub fn accepts_donations(&self, now_ms: u64) -> bool {
        self.status == CampaignStatus::Active && !self.is_completed(now_ms)
    }

    /// Funds raised but not yet withdrawn. `withdrawn_amount <=
    /// raised_amount` holds at all times, so this never underflows.
    pub fn available_for_withdrawal(&self) -> Amount {
        self.raised_amount - self.withdrawn_amount
    }
}

/// Creator-supplied fields of a new campaign.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub target_amount: Amount,
    pub min_donation: Amount,
    pub end_date_ms: u64,
}

/// Lifecycle of a withdrawal request.
///
/// ```text
/// pending ──► approved ──► completed
/// pending ──► rejected
/// ```
///
/// `completed` and `rejected` are terminal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub id: RequestId,
    pub campaign_id: CampaignId,
    pub amount: Amount,
    pub reason: String,
    pub request_date_ms: u64,
    pub status: WithdrawalStatus,
    pub approval_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    CampaignCreated {
        id: CampaignId,
        creator: Address,
        target_amount: Amount,
    },
    DonationRecorded {
        campaign_id: CampaignId,
        donor: Address,
        amount: Amount,
        hash: String,
    },
    WithdrawalRequested {
        request_id: RequestId,
        campaign_id: CampaignId,
        amount: Amount,
    },
    WithdrawalApproved {
        request_id: RequestId,
        approval_count: u32,
    },
    WithdrawalCompleted {
        request_id: RequestId,
        campaign_id: CampaignId,
        amount: Amount,
    },
    WithdrawalRejected {
        request_id: RequestId,
    },
    CampaignPaused {
        id: CampaignId,
    },
    CampaignCancelled {
        id: CampaignId,
    },
}

/// Derived campaign phase used by listing filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CampaignPhase {
    Active,
    Ended,
}

#[derive(Clone, Debug, Default)]
pub struct CampaignFilter {
    pub creator: Option<Address>,
    pub category: Option<String>,
    pub phase: Option<CampaignPhase>,
}

/// Single source of truth for campaigns, transactions, and withdrawal
/// requests.
///
/// All entities are owned here; the single-writer model needs no locking
/// discipline. Every mutation either applies fully or leaves the state
/// untouched.
pub struct LedgerState {
    campaigns: BTreeMap<CampaignId, Campaign>,
    transactions: Vec<TransactionRecord>,
    withdrawals: BTreeMap<RequestId, WithdrawalRequest>,
    events: Vec<LedgerEvent>,
    connected_wallet: Option<Address>,
    approval_threshold: u32,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            campaigns: BTreeMap::new(),
            transactions: Vec::new(),
            withdrawals: BTreeMap::new(),
            events: Vec::new(),
            connected_wallet: None,
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
        }
    }
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_approval_threshold(mut self, threshold: u32) -> Self {
        self.approval_threshold = threshold.max(1);
        self
    }

    //==================== campaigns ====================//

    pub fn create_campaign(
        &mut self,
        creator: &str,
        draft: CampaignDraft,
        now_ms: u64,
    ) -> Result<Campaign, LedgerError> {
        if creator.trim().is_empty() {
            return Err(LedgerError::Validation("creator address is required".into()));
        }
        for (field, value) in [
            ("title", &draft.title),
            ("description", &draft.description),
            ("category", &draft.category),
        ] {
            if value.trim().is_empty() {
                return Err(LedgerError::Validation(format!("{field} is required")));
            }
        }
        if draft.target_amount == 0 {
            return Err(LedgerError::Validation(
                "target amount must be greater than 0".into(),
            ));
        }
        if draft.min_donation == 0 {
            return Err(LedgerError::Validation(
                "minimum donation must be greater than 0".into(),
            ));
        }
        if draft.end_date_ms <= now_ms {
            return Err(LedgerError::Validation(
                "end date must lie in the future".into(),
            ));
        }

        let id = unique_id(format!("campaign_{now_ms}"), |id| {
            self.campaigns.contains_key(id)
        });
        let campaign = Campaign {
            id: id.clone(),
            creator: creator.to_string(),
            title: draft.title,
            description: draft.description,
            category: draft.category,
            target_amount: draft.target_amount,
            min_donation: draft.min_donation,
            end_date_ms: draft.end_date_ms,
            raised_amount: 0,
            withdrawn_amount: 0,
            donor_count: 0,
            status: CampaignStatus::Active,
            created_at_ms: now_ms,
        };
        self.events.push(LedgerEvent::CampaignCreated {
            id: id.clone(),
            creator: campaign.creator.clone(),
            target_amount: campaign.target_amount,
        });
        self.campaigns.insert(id, campaign.clone());
        Ok(campaign)
    }

    pub fn campaign(&self, id: &str) -> Option<&Campaign> {
        self.campaigns.get(id)
    }

    pub fn list_campaigns(&self, filter: &CampaignFilter, now_ms: u64) -> Vec<&Campaign> {
        self.campaigns
            .values()
            .filter(|c| match &filter.creator {
                Some(creator) => c.creator.eq_ignore_ascii_case(creator),
                None => true,
            })
            .filter(|c| match &filter.category {
                Some(category) => c.category.eq_ignore_ascii_case(category),
                None => true,
            })
            .filter(|c| match filter.phase {
                Some(CampaignPhase::Active) => !c.is_completed(now_ms),
                Some(CampaignPhase::Ended) => c.is_completed(now_ms),
                None => true,
            })
            .collect()
    }

    pub fn pause_campaign(
        &mut self,
        id: &str,
        actor: &str,
        now_ms: u64,
    ) -> Result<(), LedgerError> {
        let campaign = self.creator_campaign_mut(id, actor)?;
        let effective = campaign.effective_status(now_ms);
        if effective != CampaignStatus::Active {
            return Err(LedgerError::InvalidStatus {
                from: effective.as_str(),
            });
        }
        campaign.status = CampaignStatus::Paused;
        self.events
            .push(LedgerEvent::CampaignPaused { id: id.to_string() });
        Ok(())
    }

    pub fn cancel_campaign(
        &mut self,
        id: &str,
        actor: &str,
        now_ms: u64,
    ) -> Result<(), LedgerError> {
        let campaign = self.creator_campaign_mut(id, actor)?;
        let effective = campaign.effective_status(now_ms);
        if effective != CampaignStatus::Active {
            return Err(LedgerError::InvalidStatus {
                from: effective.as_str(),
            });
        }
        campaign.status = CampaignStatus::Cancelled;
        self.events
            .push(LedgerEvent::CampaignCancelled { id: id.to_string() });
        Ok(())
    }

    fn creator_campaign_mut(
        &mut self,
        id: &str,
        actor: &str,
    ) -> Result<&mut Campaign, LedgerError> {
        let campaign = self
            .campaigns
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound {
                what: "campaign",
                id: id.to_string(),
            })?;
        if !campaign.creator.eq_ignore_ascii_case(actor) {
            return Err(LedgerError::Unauthorized {
                actor: actor.to_string(),
            });
        }
        Ok(campaign)
    }

    //==================== donations ====================//

    /// Persist a settled donation record and update the campaign
    /// aggregates.
    ///
    /// Every successful call increments `donor_count`, including repeat
    /// donations from the same address; the counter tracks donations, not
    /// unique donors.
    pub fn record_donation(
        &mut self,
        record: TransactionRecord,
        now_ms: u64,
    ) -> Result<(), LedgerError> {
        if !record.hash_matches() {
            return Err(LedgerError::Validation(
                "transaction hash does not match its fields".into(),
            ));
        }
        let campaign = self
            .campaigns
            .get_mut(&record.campaign_id)
            .ok_or_else(|| LedgerError::NotFound {
                what: "campaign",
                id: record.campaign_id.clone(),
            })?;
        if !campaign.accepts_donations(now_ms) {
            return Err(LedgerError::CampaignClosed {
                id: campaign.id.clone(),
            });
        }
        if record.amount < campaign.min_donation {
            return Err(LedgerError::BelowMinimum {
                minimum: campaign.min_donation,
            });
        }
        campaign.raised_amount += record.amount;
        campaign.donor_count += 1;
        self.events.push(LedgerEvent::DonationRecorded {
            campaign_id: record.campaign_id.clone(),
            donor: record.sender.clone(),
            amount: record.amount,
            hash: record.hash.clone(),
        });
        self.transactions.push(record);
        Ok(())
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    pub fn transaction_by_hash(&self, hash: &str) -> Option<&TransactionRecord> {
        self.transactions.iter().find(|tx| tx.hash == hash)
    }

    pub fn user_transactions(&self, address: &str) -> Vec<&TransactionRecord> {
        self.transactions
            .iter()
            .filter(|tx| tx.sender.eq_ignore_ascii_case(address))
            .collect()
    }

    pub fn user_campaigns(&self, address: &str) -> Vec<&Campaign> {
        self.campaigns
            .values()
            .filter(|c| c.creator.eq_ignore_ascii_case(address))
            .collect()
    }

    //==================== withdrawals ====================//

    /// Create a `pending` withdrawal request. Campaign aggregates are not
    /// touched until the request settles.
    pub fn request_withdrawal(
        &mut self,
        campaign_id: &str,
        requester: &str,
        amount: Amount,
        reason: &str,
        now_ms: u64,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let campaign = self
            .campaigns
            .get(campaign_id)
            .ok_or_else(|| LedgerError::NotFound {
                what: "campaign",
                id: campaign_id.to_string(),
            })?;
        if !campaign.creator.eq_ignore_ascii_case(requester) {
            return Err(LedgerError::Unauthorized {
                actor: requester.to_string(),
            });
        }
        if amount == 0 {
            return Err(LedgerError::Validation(
                "withdrawal amount must be greater than 0".into(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(LedgerError::Validation(
                "withdrawal reason is required".into(),
            ));
        }
        let available = campaign.available_for_withdrawal();
        if amount > available {
            return Err(LedgerError::InsufficientFunds { available });
        }

        let id = unique_id(format!("wd_{now_ms}"), |id| self.withdrawals.contains_key(id));
        let request = WithdrawalRequest {
            id: id.clone(),
            campaign_id: campaign_id.to_string(),
            amount,
            reason: reason.trim().to_string(),
            request_date_ms: now_ms,
            status: WithdrawalStatus::Pending,
            approval_count: 0,
        };
        self.events.push(LedgerEvent::WithdrawalRequested {
            request_id: id.clone(),
            campaign_id: request.campaign_id.clone(),
            amount,
        });
        self.withdrawals.insert(id, request.clone());
        Ok(request)
    }

    /// Register one approval on a pending request.
    ///
    /// The approval that reaches the configured threshold settles the
    /// request: the campaign's `withdrawn_amount` grows by the requested
    /// amount (re-checked against the funds still available, since a
    /// competing request may have settled first) and the request lands in
    /// `completed`. Below the threshold only the counter moves.
    pub fn approve_withdrawal(
        &mut self,
        request_id: &str,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let (campaign_id, amount, approval_count, status) = {
            let request = self.pending_request(request_id)?;
            (
                request.campaign_id.clone(),
                request.amount,
                request.approval_count,
                request.status,
            )
        };
        debug_assert_eq!(status, WithdrawalStatus::Pending);

        let new_count = approval_count + 1;
        if new_count >= self.approval_threshold {
            let campaign =
                self.campaigns
                    .get_mut(&campaign_id)
                    .ok_or_else(|| LedgerError::NotFound {
                        what: "campaign",
                        id: campaign_id.clone(),
                    })?;
            let available = campaign.available_for_withdrawal();
            if amount > available {
                return Err(LedgerError::InsufficientFunds { available });
            }
            campaign.withdrawn_amount += amount;
            self.events.push(LedgerEvent::WithdrawalApproved {
                request_id: request_id.to_string(),
                approval_count: new_count,
            });
            self.events.push(LedgerEvent::WithdrawalCompleted {
                request_id: request_id.to_string(),
                campaign_id,
                amount,
            });
            self.update_request(request_id, new_count, WithdrawalStatus::Completed)
        } else {
            self.events.push(LedgerEvent::WithdrawalApproved {
                request_id: request_id.to_string(),
                approval_count: new_count,
            });
            self.update_request(request_id, new_count, WithdrawalStatus::Pending)
        }
    }

    pub fn reject_withdrawal(&mut self, request_id: &str) -> Result<WithdrawalRequest, LedgerError> {
        let approval_count = self.pending_request(request_id)?.approval_count;
        self.events.push(LedgerEvent::WithdrawalRejected {
            request_id: request_id.to_string(),
        });
        self.update_request(request_id, approval_count, WithdrawalStatus::Rejected)
    }

    pub fn withdrawal(&self, id: &str) -> Option<&WithdrawalRequest> {
        self.withdrawals.get(id)
    }

    pub fn campaign_withdrawals(&self, campaign_id: &str) -> Vec<&WithdrawalRequest> {
        self.withdrawals
            .values()
            .filter(|w| w.campaign_id == campaign_id)
            .collect()
    }

    pub fn creator_withdrawals(&self, address: &str) -> Vec<&WithdrawalRequest> {
        self.withdrawals
            .values()
            .filter(|w| {
                self.campaigns
                    .get(&w.campaign_id)
                    .map(|c| c.creator.eq_ignore_ascii_case(address))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn pending_request(&self, request_id: &str) -> Result<&WithdrawalRequest, LedgerError> {
        let request = self
            .withdrawals
            .get(request_id)
            .ok_or_else(|| LedgerError::NotFound {
                what: "withdrawal request",
                id: request_id.to_string(),
            })?;
        if request.status != WithdrawalStatus::Pending {
            return Err(LedgerError::InvalidStatus {
                from: request.status.as_str(),
            });
        }
        Ok(request)
    }

    fn update_request(
        &mut self,
        request_id: &str,
        approval_count: u32,
        status: WithdrawalStatus,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let request = self
            .withdrawals
            .get_mut(request_id)
            .ok_or_else(|| LedgerError::NotFound {
                what: "withdrawal request",
                id: request_id.to_string(),
            })?;
        request.approval_count = approval_count;
        request.status = status;
        Ok(request.clone())
    }

    //==================== wallet session ====================//

    pub fn connect_wallet(&mut self, address: impl Into<Address>) {
        self.connected_wallet = Some(address.into());
    }

    pub fn disconnect_wallet(&mut self) {
        self.connected_wallet = None;
    }

    pub fn connected_wallet(&self) -> Option<&str> {
        self.connected_wallet.as_deref()
    }

    //==================== events & snapshots ====================//

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            campaigns: self.campaigns.values().cloned().collect(),
            transactions: self.transactions.clone(),
            withdrawals: self.withdrawals.values().cloned().collect(),
            events: self.events.clone(),
            connected_wallet: self.connected_wallet.clone(),
            checksum: None,
        }
    }

    pub fn restore(snapshot: LedgerSnapshot) -> Self {
        Self {
            campaigns: snapshot
                .campaigns
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            transactions: snapshot.transactions,
            withdrawals: snapshot
                .withdrawals
                .into_iter()
                .map(|w| (w.id.clone(), w))
                .collect(),
            events: snapshot.events,
            connected_wallet: snapshot.connected_wallet,
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
        }
    }
}

/// Time-based ids collide when two entities land on the same millisecond;
/// a numeric suffix keeps them unique.
fn unique_id(base: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&base) {
        return base;
    }
    let mut n = 1u32;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transaction::TransactionRecord;

    const CREATOR: &str = "0x4f2accb6c94f2e1f1c22296ed60b0e9dacbca8f3";
    const DONOR: &str = "0x91b7a3c1d40f3a7e0b24a1f09a6ed0c39cc0f8ae";
    const NOW: u64 = 1_700_000_000_000;

    fn draft(target_edu: u64, min_edu: u64) -> CampaignDraft {
        CampaignDraft {
            title: "Scholarship fund".into(),
            description: "Covers tuition for ten students".into(),
            category: "education".into(),
            target_amount: target_edu * EDU_SCALE,
            min_donation: min_edu * EDU_SCALE,
            end_date_ms: NOW + 30 * MS_PER_DAY,
        }
    }

    fn donate(
        ledger: &mut LedgerState,
        campaign_id: &str,
        donor: &str,
        amount_edu: u64,
        now_ms: u64,
    ) -> Result<(), LedgerError> {
        let recipient = ledger
            .campaign(campaign_id)
            .map(|c| c.creator.clone())
            .unwrap_or_default();
        let record = TransactionRecord::build(
            donor,
            recipient,
            amount_edu * EDU_SCALE,
            campaign_id,
            now_ms,
        );
        ledger.record_donation(record, now_ms)
    }

    fn funded_campaign(ledger: &mut LedgerState) -> CampaignId {
        let campaign = ledger.create_campaign(CREATOR, draft(1_000, 10), NOW).unwrap();
        donate(ledger, &campaign.id, DONOR, 500, NOW + 1).unwrap();
        campaign.id
    }

    #[test]
    fn create_campaign_validates_and_defaults() {
        let mut ledger = LedgerState::new();
        let campaign = ledger.create_campaign(CREATOR, draft(1_000, 10), NOW).unwrap();
        assert_eq!(campaign.status, CampaignStatus::Active);
        assert_eq!(campaign.raised_amount, 0);
        assert_eq!(campaign.withdrawn_amount, 0);
        assert_eq!(campaign.donor_count, 0);
        assert!(campaign.id.starts_with("campaign_"));

        let mut blank = draft(1_000, 10);
        blank.title = "  ".into();
        assert!(matches!(
            ledger.create_campaign(CREATOR, blank, NOW),
            Err(LedgerError::Validation(_))
        ));
        let mut zero_target = draft(1_000, 10);
        zero_target.target_amount = 0;
        assert!(matches!(
            ledger.create_campaign(CREATOR, zero_target, NOW),
            Err(LedgerError::Validation(_))
        ));
        let mut past_end = draft(1_000, 10);
        past_end.end_date_ms = NOW;
        assert!(matches!(
            ledger.create_campaign(CREATOR, past_end, NOW),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn same_millisecond_ids_get_a_suffix() {
        let mut ledger = LedgerState::new();
        let a = ledger.create_campaign(CREATOR, draft(100, 1), NOW).unwrap();
        let b = ledger.create_campaign(CREATOR, draft(100, 1), NOW).unwrap();
        assert_ne!(a.id, b.id);
        assert!(b.id.starts_with(&a.id));
    }

    #[test]
    fn donation_scenario_reaches_completion_by_target() {
        let mut ledger = LedgerState::new();
        let campaign = ledger.create_campaign(CREATOR, draft(1_000, 10), NOW).unwrap();
        assert_eq!(campaign.effective_status(NOW), CampaignStatus::Active);

        donate(&mut ledger, &campaign.id, DONOR, 50, NOW + 1).unwrap();
        let after_first = ledger.campaign(&campaign.id).unwrap();
        assert_eq!(after_first.raised_amount, 50 * EDU_SCALE);
        assert_eq!(after_first.donor_count, 1);
        assert_eq!(after_first.effective_status(NOW + 1), CampaignStatus::Active);

        donate(&mut ledger, &campaign.id, DONOR, 950, NOW + 2).unwrap();
        let after_second = ledger.campaign(&campaign.id).unwrap();
        assert_eq!(after_second.raised_amount, 1_000 * EDU_SCALE);
        // Target reached: completed even though the end date is unchanged.
        assert!(after_second.is_completed(NOW + 3));
        assert_eq!(
            after_second.effective_status(NOW + 3),
            CampaignStatus::Completed
        );
        assert_eq!(after_second.end_date_ms, NOW + 30 * MS_PER_DAY);
    }

    #[test]
    fn repeat_donors_are_counted_per_donation() {
        let mut ledger = LedgerState::new();
        let campaign = ledger.create_campaign(CREATOR, draft(1_000, 10), NOW).unwrap();
        donate(&mut ledger, &campaign.id, DONOR, 25, NOW + 1).unwrap();
        donate(&mut ledger, &campaign.id, DONOR, 25, NOW + 2).unwrap();
        let after = ledger.campaign(&campaign.id).unwrap();
        assert_eq!(after.raised_amount, 50 * EDU_SCALE);
        assert_eq!(after.donor_count, 2);
    }

    #[test]
    fn donations_are_validated() {
        let mut ledger = LedgerState::new();
        let campaign = ledger.create_campaign(CREATOR, draft(1_000, 10), NOW).unwrap();

        assert!(matches!(
            donate(&mut ledger, "campaign_missing", DONOR, 50, NOW),
            Err(LedgerError::NotFound { .. })
        ));
        assert!(matches!(
            donate(&mut ledger, &campaign.id, DONOR, 5, NOW + 1),
            Err(LedgerError::BelowMinimum { .. })
        ));
        // Past the end date the campaign is derived-complete.
        assert!(matches!(
            donate(&mut ledger, &campaign.id, DONOR, 50, NOW + 31 * MS_PER_DAY),
            Err(LedgerError::CampaignClosed { .. })
        ));
        let after = ledger.campaign(&campaign.id).unwrap();
        assert_eq!(after.raised_amount, 0);
        assert_eq!(after.donor_count, 0);
        assert!(ledger.transactions().is_empty());
    }

    #[test]
    fn tampered_records_are_rejected() {
        let mut ledger = LedgerState::new();
        let campaign = ledger.create_campaign(CREATOR, draft(1_000, 10), NOW).unwrap();
        let mut record =
            TransactionRecord::build(DONOR, CREATOR, 50 * EDU_SCALE, &campaign.id, NOW + 1);
        record.amount = 500 * EDU_SCALE;
        assert!(matches!(
            ledger.record_donation(record, NOW + 1),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn paused_and_cancelled_campaigns_refuse_donations() {
        let mut ledger = LedgerState::new();
        let campaign = ledger.create_campaign(CREATOR, draft(1_000, 10), NOW).unwrap();
        ledger.pause_campaign(&campaign.id, CREATOR, NOW + 1).unwrap();
        assert!(matches!(
            donate(&mut ledger, &campaign.id, DONOR, 50, NOW + 2),
            Err(LedgerError::CampaignClosed { .. })
        ));
        // paused → cancelled is not a legal transition
        assert!(matches!(
            ledger.cancel_campaign(&campaign.id, CREATOR, NOW + 3),
            Err(LedgerError::InvalidStatus { from: "paused" })
        ));
    }

    #[test]
    fn lifecycle_actions_are_creator_only() {
        let mut ledger = LedgerState::new();
        let campaign = ledger.create_campaign(CREATOR, draft(1_000, 10), NOW).unwrap();
        assert!(matches!(
            ledger.pause_campaign(&campaign.id, DONOR, NOW + 1),
            Err(LedgerError::Unauthorized { .. })
        ));
        // Address comparison ignores case.
        let shouty = CREATOR.to_uppercase();
        ledger.pause_campaign(&campaign.id, &shouty, NOW + 1).unwrap();
    }

    #[test]
    fn listing_filters_by_creator_category_and_phase() {
        let mut ledger = LedgerState::new();
        let education = ledger.create_campaign(CREATOR, draft(1_000, 10), NOW).unwrap();
        let mut health = draft(200, 1);
        health.category = "health".into();
        let health = ledger.create_campaign(DONOR, health, NOW).unwrap();
        donate(&mut ledger, &health.id, CREATOR, 200, NOW + 1).unwrap();

        let all = ledger.list_campaigns(&CampaignFilter::default(), NOW + 2);
        assert_eq!(all.len(), 2);

        let mine = ledger.list_campaigns(
            &CampaignFilter {
                creator: Some(CREATOR.to_uppercase()),
                ..Default::default()
            },
            NOW + 2,
        );
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, education.id);

        let ended = ledger.list_campaigns(
            &CampaignFilter {
                phase: Some(CampaignPhase::Ended),
                ..Default::default()
            },
            NOW + 2,
        );
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].id, health.id);

        let health_only = ledger.list_campaigns(
            &CampaignFilter {
                category: Some("health".into()),
                ..Default::default()
            },
            NOW + 2,
        );
        assert_eq!(health_only.len(), 1);
    }

    #[test]
    fn withdrawal_settles_at_the_default_threshold() {
        let mut ledger = LedgerState::new();
        let campaign_id = funded_campaign(&mut ledger);
        let request = ledger
            .request_withdrawal(&campaign_id, CREATOR, 200 * EDU_SCALE, "venue deposit", NOW + 10)
            .unwrap();
        assert_eq!(request.status, WithdrawalStatus::Pending);
        assert_eq!(request.approval_count, 0);
        // The request itself moves no funds.
        assert_eq!(
            ledger.campaign(&campaign_id).unwrap().withdrawn_amount,
            0
        );

        let settled = ledger.approve_withdrawal(&request.id).unwrap();
        assert_eq!(settled.status, WithdrawalStatus::Completed);
        assert_eq!(settled.approval_count, 1);
        let campaign = ledger.campaign(&campaign_id).unwrap();
        assert_eq!(campaign.withdrawn_amount, 200 * EDU_SCALE);
        assert!(campaign.withdrawn_amount <= campaign.raised_amount);
    }

    #[test]
    fn withdrawal_respects_a_higher_threshold() {
        let mut ledger = LedgerState::new().with_approval_threshold(2);
        let campaign_id = funded_campaign(&mut ledger);
        let request = ledger
            .request_withdrawal(&campaign_id, CREATOR, 100 * EDU_SCALE, "equipment", NOW + 10)
            .unwrap();

        let first = ledger.approve_withdrawal(&request.id).unwrap();
        assert_eq!(first.status, WithdrawalStatus::Pending);
        assert_eq!(first.approval_count, 1);
        assert_eq!(ledger.campaign(&campaign_id).unwrap().withdrawn_amount, 0);

        let second = ledger.approve_withdrawal(&request.id).unwrap();
        assert_eq!(second.status, WithdrawalStatus::Completed);
        assert_eq!(
            ledger.campaign(&campaign_id).unwrap().withdrawn_amount,
            100 * EDU_SCALE
        );
    }

    #[test]
    fn withdrawal_requests_are_validated() {
        let mut ledger = LedgerState::new();
        assert!(matches!(
            ledger.request_withdrawal("campaign_missing", CREATOR, 1, "r", NOW),
            Err(LedgerError::NotFound { .. })
        ));
        // Nothing was persisted for the missing campaign.
        assert!(ledger.campaign_withdrawals("campaign_missing").is_empty());

        let campaign_id = funded_campaign(&mut ledger);
        assert!(matches!(
            ledger.request_withdrawal(&campaign_id, DONOR, 1, "r", NOW),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(matches!(
            ledger.request_withdrawal(&campaign_id, CREATOR, 0, "r", NOW),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.request_withdrawal(&campaign_id, CREATOR, 1, "  ", NOW),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            ledger.request_withdrawal(&campaign_id, CREATOR, 501 * EDU_SCALE, "too much", NOW),
            Err(LedgerError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn competing_withdrawals_cannot_overdraw() {
        let mut ledger = LedgerState::new();
        let campaign_id = funded_campaign(&mut ledger); // 500 EDU raised
        let first = ledger
            .request_withdrawal(&campaign_id, CREATOR, 300 * EDU_SCALE, "phase one", NOW + 10)
            .unwrap();
        let second = ledger
            .request_withdrawal(&campaign_id, CREATOR, 300 * EDU_SCALE, "phase two", NOW + 11)
            .unwrap();

        ledger.approve_withdrawal(&first.id).unwrap();
        // The second request was fine at request time but the funds are
        // gone now; the approval fails and the request stays pending.
        assert!(matches!(
            ledger.approve_withdrawal(&second.id),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        let second_after = ledger.withdrawal(&second.id).unwrap();
        assert_eq!(second_after.status, WithdrawalStatus::Pending);
        assert_eq!(second_after.approval_count, 0);
        let campaign = ledger.campaign(&campaign_id).unwrap();
        assert_eq!(campaign.withdrawn_amount, 300 * EDU_SCALE);
    }

    #[test]
    fn terminal_requests_refuse_further_transitions() {
        let mut ledger = LedgerState::new();
        let campaign_id = funded_campaign(&mut ledger);
        let request = ledger
            .request_withdrawal(&campaign_id, CREATOR, 10 * EDU_SCALE, "books", NOW + 10)
            .unwrap();
        ledger.reject_withdrawal(&request.id).unwrap();
        assert!(matches!(
            ledger.approve_withdrawal(&request.id),
            Err(LedgerError::InvalidStatus { from: "rejected" })
        ));
        assert!(matches!(
            ledger.reject_withdrawal(&request.id),
            Err(LedgerError::InvalidStatus { from: "rejected" })
        ));
    }

    #[test]
    fn user_queries_match_addresses_case_insensitively() {
        let mut ledger = LedgerState::new();
        let campaign_id = funded_campaign(&mut ledger);
        let transactions = ledger.user_transactions(&DONOR.to_uppercase());
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].campaign_id, campaign_id);
        assert_eq!(ledger.user_campaigns(&CREATOR.to_uppercase()).len(), 1);
        assert!(ledger.user_transactions(CREATOR).is_empty());

        let hash = transactions[0].hash.clone();
        assert!(ledger.transaction_by_hash(&hash).is_some());
        assert!(ledger.transaction_by_hash("0000").is_none());
    }

    #[test]
    fn events_trace_every_mutation() {
        let mut ledger = LedgerState::new();
        let campaign_id = funded_campaign(&mut ledger);
        let request = ledger
            .request_withdrawal(&campaign_id, CREATOR, 10 * EDU_SCALE, "books", NOW + 10)
            .unwrap();
        ledger.approve_withdrawal(&request.id).unwrap();
        let kinds: Vec<_> = ledger
            .events()
            .iter()
            .map(|e| match e {
                LedgerEvent::CampaignCreated { .. } => "created",
                LedgerEvent::DonationRecorded { .. } => "donation",
                LedgerEvent::WithdrawalRequested { .. } => "requested",
                LedgerEvent::WithdrawalApproved { .. } => "approved",
                LedgerEvent::WithdrawalCompleted { .. } => "completed",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["created", "donation", "requested", "approved", "completed"]
        );
    }
}
