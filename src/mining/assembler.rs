//! Block template construction.
//!
//! Transactions are selected in packages: a candidate together with every
//! in-pool ancestor not yet in the block. Candidates come from two sources,
//! the pool's ancestor score index and the [`ModifiedTxSet`] overlay holding
//! entries whose ancestor state shrank because ancestors were already placed.
//! Whichever head scores higher is tried next; selection ends at the first
//! package below the minimum fee rate.

use super::block::{AssemblyStats, Block, BlockHeader, BlockTemplate};
use super::coinbase::{
    block_merkle_root, coinbase_script_sig, empty_output, generate_coinbase_commitment,
    new_coinbase, pow_script_sig,
};
use super::header::update_time_at;
use super::modified_entry::{ModifiedEntry, ModifiedTxSet};
use super::rewards::{coinbase_outputs, RewardInputs, UplineLedger, WalletSelector};
use super::stake::{StakeProvider, StakeReward};
use crate::chain::{
    adjusted_time, BlockIndex, BlockValidator, ChainParams, NodeState, RewardOracle, WorkOracle,
};
use crate::config::AssemblerOptions;
use crate::error::AssemblyError;
use crate::mempool::{AncestorLimits, MempoolEntry, TxMemPool};
use crate::parsing::transaction_structs::{Transaction, Txid};
use crate::policy::{Amount, FeeRate};
use crate::validation::finality::is_final_tx;
use crate::validation::sigops::legacy_sigop_count;
use crate::validation::weight_calculation::{is_segwit, WITNESS_SCALE_FACTOR};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Give up once this many packages in a row did not fit and the block is
/// within 4000 weight units of full.
pub const MAX_CONSECUTIVE_FAILURES: usize = 1000;
// weight and sigop cost reserved for the header and coinbase
const COINBASE_RESERVED_WEIGHT: u64 = 4000;
const COINBASE_RESERVED_SIGOPS: u64 = 400;
// fee and sigop entries of coinbase and coinstake until they are known
const PLACEHOLDER: i64 = -1;

/// External services consulted while assembling.
#[derive(Clone, Copy)]
pub struct AssemblyServices<'a> {
    pub work: &'a dyn WorkOracle,
    pub rewards: &'a dyn RewardOracle,
    pub validator: &'a dyn BlockValidator,
}

// block body and running totals of one assembly call
#[derive(Debug)]
struct BlockInProgress {
    vtx: Vec<Arc<Transaction>>,
    tx_fees: Vec<Amount>,
    tx_sigops_cost: Vec<i64>,
    in_block: HashSet<Txid>,
    block_weight: u64,
    block_sigops_cost: u64,
    block_tx: usize,
    fees: Amount,
    height: u32,
    lock_time_cutoff: i64,
    include_witness: bool,
    stats: AssemblyStats,
}

impl BlockInProgress {
    // reserved_slots: coinbase, plus the coinstake for proof-of-stake
    fn reset(reserved_slots: usize, height: u32, lock_time_cutoff: i64, include_witness: bool) -> Self {
        BlockInProgress {
            vtx: Vec::new(),
            tx_fees: vec![PLACEHOLDER; reserved_slots],
            tx_sigops_cost: vec![PLACEHOLDER; reserved_slots],
            in_block: HashSet::new(),
            block_weight: COINBASE_RESERVED_WEIGHT,
            block_sigops_cost: COINBASE_RESERVED_SIGOPS,
            block_tx: 0,
            fees: 0,
            height,
            lock_time_cutoff,
            include_witness,
            stats: AssemblyStats::default(),
        }
    }

    fn finish_stats(&mut self) {
        self.stats.block_tx_count = self.block_tx;
        self.stats.block_weight = self.block_weight;
        self.stats.block_sigops_cost = self.block_sigops_cost;
        self.stats.fees = self.fees;
    }
}

// the package chosen in one round of the selection loop
#[derive(Debug, Clone, Copy)]
struct Candidate {
    txid: Txid,
    package_size: u64,
    package_fees: Amount,
    package_sigops: u64,
    using_modified: bool,
}

impl Candidate {
    fn from_pool(entry: &MempoolEntry) -> Self {
        Candidate {
            txid: entry.txid(),
            package_size: entry.size_with_ancestors(),
            package_fees: entry.mod_fees_with_ancestors(),
            package_sigops: entry.sigop_cost_with_ancestors(),
            using_modified: false,
        }
    }

    fn from_modified(entry: &ModifiedEntry) -> Self {
        Candidate {
            txid: entry.txid(),
            package_size: entry.size_with_ancestors(),
            package_fees: entry.mod_fees_with_ancestors(),
            package_sigops: entry.sigop_cost_with_ancestors(),
            using_modified: true,
        }
    }
}

pub struct BlockAssembler<'a> {
    params: &'a ChainParams,
    options: AssemblerOptions,
    services: AssemblyServices<'a>,
}

impl<'a> BlockAssembler<'a> {
    pub fn new(params: &'a ChainParams, options: AssemblerOptions, services: AssemblyServices<'a>) -> Self {
        BlockAssembler {
            params,
            options: options.clamped(),
            services,
        }
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    fn block_version(&self) -> i32 {
        match self.options.block_version {
            Some(version) if self.params.mine_blocks_on_demand => version,
            _ => self.params.block_version,
        }
    }

    fn lock_time_cutoff(&self, prev: &BlockIndex, block_time: u32) -> i64 {
        if self.params.locktime_median_time_past {
            prev.median_time_past
        } else {
            block_time as i64
        }
    }

    fn block_time_now(&self) -> i64 {
        self.options.block_time.map_or_else(adjusted_time, i64::from)
    }

    /// Assembles a proof-of-work block template on top of the current tip.
    ///
    /// `script_pubkey` receives the reward when the selected wallet has no
    /// key in the upline ledger. Errors are fatal for this round; nothing is
    /// returned partially built.
    pub fn create_new_block(
        &self,
        node: &NodeState,
        script_pubkey: &[u8],
        selector: &str,
        ledger: &dyn UplineLedger,
    ) -> Result<BlockTemplate, AssemblyError> {
        let time_start = Instant::now();
        let selector: WalletSelector = selector.parse()?;

        let locked = node.lock_chain_and_pool();
        let prev = locked.chain.tip().cloned().ok_or(AssemblyError::MissingTip)?;
        let pool: &TxMemPool = &locked.mempool;
        let height = prev.height + 1;

        let now = self.block_time_now();
        let mut header = BlockHeader {
            version: self.block_version(),
            prev_block_hash: prev.hash,
            time: to_block_time(now),
            ..BlockHeader::default()
        };
        let mut block = BlockInProgress::reset(
            1,
            height,
            self.lock_time_cutoff(&prev, header.time),
            self.options.include_witness,
        );
        self.add_package_txs(pool, &mut block)?;
        let time_selected = Instant::now();
        block.finish_stats();

        let subsidy = self.services.rewards.block_subsidy(height);
        let outputs = coinbase_outputs(
            ledger,
            &selector,
            RewardInputs {
                fees: block.fees,
                subsidy,
                masternode_reward: self.services.rewards.masternode_reward(height, subsidy),
                fallback_script: script_pubkey,
                upline_active: self.params.upline_active(header.time),
            },
        )?;
        let coinbase = new_coinbase(pow_script_sig(height), outputs)?;

        update_time_at(&mut header, self.params, &prev, self.services.work, false, now);
        header.bits = self
            .services
            .work
            .next_work_required(&prev, &header, self.params, false);
        header.nonce = 0;

        let mut assembled = Block {
            header,
            vtx: Vec::with_capacity(block.vtx.len() + 1),
        };
        assembled.vtx.push(Arc::new(coinbase));
        assembled.vtx.append(&mut block.vtx);
        let coinbase_commitment = generate_coinbase_commitment(&mut assembled)?;
        assembled.header.merkle_root = block_merkle_root(&assembled);

        block.tx_fees[0] = -block.fees;
        block.tx_sigops_cost[0] = coinbase_sigops(&assembled.vtx[0]);

        info!(
            weight = assembled.weight(),
            txs = block.block_tx,
            fees = block.fees,
            sigops = block.block_sigops_cost,
            "CreateNewBlock(): assembled block"
        );

        self.services
            .validator
            .test_block_validity(self.params, &assembled, &prev)
            .map_err(|failure| AssemblyError::BlockValidity(failure.to_string()))?;
        let time_validated = Instant::now();
        debug!(
            packages = block.stats.packages_selected,
            updated_descendants = block.stats.descendants_updated,
            packages_ms = millis(time_start, time_selected),
            validity_ms = millis(time_selected, time_validated),
            total_ms = millis(time_start, time_validated),
            "CreateNewBlock() bench"
        );

        Ok(BlockTemplate {
            block: assembled,
            tx_fees: block.tx_fees,
            tx_sigops_cost: block.tx_sigops_cost,
            coinbase_commitment,
            stats: block.stats,
        })
    }

    /// Assembles a proof-of-stake block template, coinbase first and the
    /// coinstake from `stake` second.
    ///
    /// returns: `Ok(None)` when no template is available this time slot:
    /// the next height must be proof-of-work, no stake was found, or the
    /// assembled block failed validation.
    pub fn create_new_stake(
        &self,
        node: &NodeState,
        stake: &dyn StakeProvider,
    ) -> Result<Option<BlockTemplate>, AssemblyError> {
        let time_start = Instant::now();
        let block_time = to_block_time(self.block_time_now());
        if block_time < self.params.pos_start_time {
            return Err(AssemblyError::StakingNotStarted {
                block_time,
                start_time: self.params.pos_start_time,
            });
        }

        let locked = node.lock_chain_and_pool();
        let prev = locked.chain.tip().cloned().ok_or(AssemblyError::MissingTip)?;
        let pool: &TxMemPool = &locked.mempool;
        let height = prev.height + 1;

        let mut header = BlockHeader {
            version: self.block_version(),
            prev_block_hash: prev.hash,
            time: block_time,
            ..BlockHeader::default()
        };
        let interval = self.params.difficulty_adjustment_interval;
        let retarget_must_be_pow = self
            .params
            .pow_retarget_rule_time
            .is_some_and(|rule_time| block_time >= rule_time);
        if retarget_must_be_pow && interval != 0 && height % interval == 0 {
            debug!(height, "difficulty adjustment block must be proof-of-work");
            return Ok(None);
        }
        header.bits = self
            .services
            .work
            .next_work_required(&prev, &header, self.params, true);

        let mut block = BlockInProgress::reset(
            2,
            height,
            self.lock_time_cutoff(&prev, block_time),
            self.options.include_witness,
        );
        self.add_package_txs(pool, &mut block)?;
        let time_selected = Instant::now();
        block.finish_stats();

        let coinbase = new_coinbase(
            coinbase_script_sig(height, &self.params.coinbase_flags),
            vec![empty_output()],
        )?;
        let mut assembled = Block {
            header,
            vtx: Vec::with_capacity(block.vtx.len() + 2),
        };
        assembled.vtx.push(Arc::new(coinbase));
        assembled.vtx.append(&mut block.vtx);

        let subsidy = self.services.rewards.block_subsidy(height);
        let reward = StakeReward {
            fees: block.fees,
            subsidy,
            masternode_reward: self.services.rewards.masternode_reward(height, subsidy),
        };
        let Some(coinstake) = stake.create_coinstake(&assembled, &reward) else {
            debug!(height, "no stake found");
            return Ok(None);
        };
        block.tx_sigops_cost[1] = coinstake.meta.sigop_cost as i64;
        block.tx_fees[1] = 0;
        assembled.vtx.insert(1, Arc::new(coinstake));

        let coinbase_commitment = generate_coinbase_commitment(&mut assembled)?;
        assembled.header.merkle_root = block_merkle_root(&assembled);
        assembled.header.nonce = 0;
        block.tx_fees[0] = block.fees;
        block.tx_sigops_cost[0] = coinbase_sigops(&assembled.vtx[0]);

        if let Err(failure) = self
            .services
            .validator
            .test_block_validity(self.params, &assembled, &prev)
        {
            warn!(%failure, height, "CreateNewStake(): TestBlockValidity failed");
            return Ok(None);
        }
        debug!(
            packages = block.stats.packages_selected,
            updated_descendants = block.stats.descendants_updated,
            total_ms = millis(time_start, time_selected),
            "CreateNewStake() bench"
        );

        Ok(Some(BlockTemplate {
            block: assembled,
            tx_fees: block.tx_fees,
            tx_sigops_cost: block.tx_sigops_cost,
            coinbase_commitment,
            stats: block.stats,
        }))
    }

    // This transaction selection algorithm orders the mempool based
    // on feerate of a transaction including all unconfirmed ancestors.
    // Since we don't remove transactions from the mempool as we select them
    // for block inclusion, we need an alternate method of updating the feerate
    // of a transaction with its not-yet-selected ancestors as we go.
    // This is accomplished by walking the in-mempool descendants of selected
    // transactions and storing a temporary modified state in the overlay.
    fn add_package_txs(&self, pool: &TxMemPool, block: &mut BlockInProgress) -> Result<(), AssemblyError> {
        let mut modified = ModifiedTxSet::new();
        // packages that did not fit, their cached ancestor state is stale
        let mut failed: HashSet<Txid> = HashSet::new();

        let already_in_block = block.in_block.clone();
        block.stats.descendants_updated +=
            update_packages_for_added(pool, &already_in_block, &failed, &mut modified);

        let mut pool_iter = pool.iter_by_ancestor_score().peekable();
        let mut consecutive_failed = 0usize;

        loop {
            let head = pool_iter.peek().copied();
            if let Some(entry) = head {
                if skip_map_tx_entry(&entry.txid(), block, &modified, &failed) {
                    pool_iter.next();
                    continue;
                }
            }

            // the overlay only wins with a strictly better score
            let candidate = match (head, modified.best()) {
                (None, None) => break,
                (None, Some(best)) => Candidate::from_modified(best),
                (Some(entry), Some(best)) if best.ancestor_score() > entry.ancestor_score() => {
                    Candidate::from_modified(best)
                }
                (Some(entry), _) => {
                    pool_iter.next();
                    Candidate::from_pool(entry)
                }
            };
            debug_assert!(!block.in_block.contains(&candidate.txid));

            if candidate.package_fees < self.options.block_min_fee_rate.get_fee(candidate.package_size) {
                // everything else we might consider has a lower fee rate
                break;
            }

            if !self.test_package(block, candidate.package_size, candidate.package_sigops) {
                if candidate.using_modified {
                    modified.erase(&candidate.txid);
                    failed.insert(candidate.txid);
                }
                block.stats.capacity_rejections += 1;
                consecutive_failed += 1;
                let nearly_full = block.block_weight
                    > self.options.block_max_weight.saturating_sub(COINBASE_RESERVED_WEIGHT);
                if consecutive_failed > MAX_CONSECUTIVE_FAILURES && nearly_full {
                    debug!(consecutive_failed, "giving up on filling the block");
                    break;
                }
                continue;
            }

            let mut ancestors = pool.calculate_ancestors(&candidate.txid, AncestorLimits::unlimited())?;
            only_unconfirmed(&mut ancestors, block);
            ancestors.insert(candidate.txid);

            if !self.test_package_transactions(pool, &ancestors, block)? {
                if candidate.using_modified {
                    modified.erase(&candidate.txid);
                    failed.insert(candidate.txid);
                }
                block.stats.policy_rejections += 1;
                continue;
            }

            // this package will make it in, reset the failed counter
            consecutive_failed = 0;

            for entry in sort_for_block(pool, &ancestors)? {
                self.add_to_block(entry, block);
                modified.erase(&entry.txid());
            }
            block.stats.packages_selected += 1;
            block.stats.descendants_updated +=
                update_packages_for_added(pool, &ancestors, &failed, &mut modified);
        }
        Ok(())
    }

    // a package must leave the block strictly below its weight and sigop limits
    fn test_package(&self, block: &BlockInProgress, package_size: u64, package_sigops: u64) -> bool {
        if block.block_weight + WITNESS_SCALE_FACTOR * package_size >= self.options.block_max_weight {
            return false;
        }
        if block.block_sigops_cost + package_sigops >= self.params.max_block_sigops_cost {
            return false;
        }
        true
    }

    // every package member must be final, and carry no witness unless
    // witness transactions are included
    fn test_package_transactions(
        &self,
        pool: &TxMemPool,
        package: &HashSet<Txid>,
        block: &BlockInProgress,
    ) -> Result<bool, AssemblyError> {
        for txid in package {
            let tx = pool.entry(txid)?.tx();
            if !is_final_tx(tx, block.height, block.lock_time_cutoff) {
                return Ok(false);
            }
            if !block.include_witness && is_segwit(tx) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn add_to_block(&self, entry: &MempoolEntry, block: &mut BlockInProgress) {
        block.vtx.push(entry.shared_tx());
        block.tx_fees.push(entry.fee() as Amount);
        block.tx_sigops_cost.push(entry.sigop_cost() as i64);
        block.block_weight += entry.tx_weight();
        block.block_tx += 1;
        block.block_sigops_cost += entry.sigop_cost();
        block.fees += entry.fee() as Amount;
        block.in_block.insert(entry.txid());

        if self.options.print_priority {
            debug!(
                fee_rate = %FeeRate::from_fee_and_size(entry.modified_fee(), entry.tx_size()),
                txid = %entry.txid(),
                "selected transaction"
            );
        }
    }
}

// entries already handled elsewhere: in the block, overlaid or failed
fn skip_map_tx_entry(
    txid: &Txid,
    block: &BlockInProgress,
    modified: &ModifiedTxSet,
    failed: &HashSet<Txid>,
) -> bool {
    modified.contains(txid) || block.in_block.contains(txid) || failed.contains(txid)
}

fn only_unconfirmed(package: &mut HashSet<Txid>, block: &BlockInProgress) {
    package.retain(|txid| !block.in_block.contains(txid));
}

// an ancestor always has fewer in-pool ancestors than its descendants, so
// ascending ancestor count is a valid dependency order
fn sort_for_block<'p>(
    pool: &'p TxMemPool,
    package: &HashSet<Txid>,
) -> Result<Vec<&'p MempoolEntry>, AssemblyError> {
    let mut sorted = package
        .iter()
        .map(|txid| pool.entry(txid))
        .collect::<Result<Vec<_>, _>>()?;
    sorted.sort_by(|a, b| {
        a.count_with_ancestors()
            .cmp(&b.count_with_ancestors())
            .then_with(|| a.txid().cmp(&b.txid()))
    });
    Ok(sorted)
}

// Walks the in-pool descendants of newly added transactions and subtracts
// the added transaction's contribution from their overlaid ancestor state.
// Failed packages stay out of the overlay for the rest of the call.
// returns: number of descendant updates
fn update_packages_for_added(
    pool: &TxMemPool,
    already_added: &HashSet<Txid>,
    failed: &HashSet<Txid>,
    modified: &mut ModifiedTxSet,
) -> usize {
    let mut descendants_updated = 0;
    for added_id in already_added {
        let Some(added) = pool.get(added_id) else {
            continue;
        };
        let mut descendants = HashSet::new();
        pool.calculate_descendants(added_id, &mut descendants);
        for descendant_id in &descendants {
            if already_added.contains(descendant_id) || failed.contains(descendant_id) {
                continue;
            }
            descendants_updated += 1;
            if let Some(descendant) = pool.get(descendant_id) {
                modified.insert_or_adjust(
                    descendant,
                    added.tx_size(),
                    added.modified_fee(),
                    added.sigop_cost(),
                );
            }
        }
    }
    descendants_updated
}

fn coinbase_sigops(coinbase: &Transaction) -> i64 {
    (WITNESS_SCALE_FACTOR * legacy_sigop_count(coinbase)) as i64
}

fn to_block_time(time: i64) -> u32 {
    time.clamp(0, u32::MAX as i64) as u32
}

fn millis(from: Instant, to: Instant) -> f64 {
    to.duration_since(from).as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainState, FixedWork, HalvingSchedule};
    use crate::mining::rewards::MemoryLedger;
    use crate::mining::validity::StructuralValidator;
    use crate::testing::{chain_tx, TxBuilder};

    const WORK: FixedWork = FixedWork(0x207fffff);
    const SCHEDULE: HalvingSchedule = HalvingSchedule {
        initial_subsidy: 50 * crate::policy::COIN,
        halving_interval: 150,
        masternode_percent: 0,
    };

    fn services() -> AssemblyServices<'static> {
        AssemblyServices {
            work: &WORK,
            rewards: &SCHEDULE,
            validator: &StructuralValidator,
        }
    }

    fn node(txs: Vec<Transaction>) -> NodeState {
        let tip = BlockIndex {
            hash: [1u8; 32],
            height: 100,
            time: 1_700_000_000,
            median_time_past: 1_700_000_000,
            bits: 0x207fffff,
        };
        NodeState::new(ChainState::new(tip), TxMemPool::from_transactions(txs))
    }

    fn options() -> AssemblerOptions {
        AssemblerOptions {
            block_time: Some(1_700_000_600),
            ..AssemblerOptions::default()
        }
    }

    fn selected(template: &BlockTemplate) -> Vec<Txid> {
        template.block.vtx[1..].iter().map(|tx| tx.meta.txid).collect()
    }

    #[test]
    fn overlay_lifts_sibling_of_placed_package() {
        // the cheap parent drags both children down until it is placed
        let parent = TxBuilder::new(1).fee(1000).weight(400).build();
        let rich_child = chain_tx(2, &parent, 10_000, 400);
        let other_child = TxBuilder::new(3)
            .spends(parent.meta.txid, 1)
            .fee(5000)
            .weight(400)
            .build();
        let middle = TxBuilder::new(4).fee(4000).weight(400).build();
        let node = node(vec![
            parent.clone(),
            rich_child.clone(),
            other_child.clone(),
            middle.clone(),
        ]);

        let params = ChainParams::default();
        let assembler = BlockAssembler::new(&params, options(), services());
        let template = assembler
            .create_new_block(&node, &[0x51], "ok", &MemoryLedger::default())
            .unwrap();

        // other_child scores 30 in the pool but 50 once its parent is in
        assert_eq!(
            selected(&template),
            vec![
                parent.meta.txid,
                rich_child.meta.txid,
                other_child.meta.txid,
                middle.meta.txid
            ]
        );
        assert_eq!(template.tx_fees, vec![-20_000, 1000, 10_000, 5000, 4000]);
        assert_eq!(template.stats.packages_selected, 3);
        assert_eq!(template.stats.descendants_updated, 1);
        assert_eq!(
            template.block.vtx[0].vout[0].value,
            (50 * crate::policy::COIN + 20_000) as u64
        );
    }

    #[test]
    fn failed_package_is_not_revived_by_a_later_parent() {
        let a = TxBuilder::new(1).fee(100_000).weight(400).build();
        let p = TxBuilder::new(2).fee(600).weight(2000).build();
        let c = TxBuilder::new(3)
            .spends(a.meta.txid, 0)
            .spends(p.meta.txid, 0)
            .fee(50_000)
            .weight(2000)
            .build();
        let node = node(vec![a.clone(), p.clone(), c]);

        // a fits, c (with p) does not, p alone does
        let params = ChainParams::default();
        let options = AssemblerOptions {
            block_max_weight: 8000,
            ..options()
        };
        let assembler = BlockAssembler::new(&params, options, services());
        let template = assembler
            .create_new_block(&node, &[0x51], "ok", &MemoryLedger::default())
            .unwrap();

        assert_eq!(selected(&template), vec![a.meta.txid, p.meta.txid]);
        assert_eq!(template.stats.capacity_rejections, 1);
    }

    #[test]
    fn fee_floor_stops_selection() {
        let rich = TxBuilder::new(1).fee(1000).weight(400).build();
        // 99 sat over 100 vB is below 1 sat/vB
        let poor = TxBuilder::new(2).fee(99).weight(400).build();
        let node = node(vec![rich.clone(), poor]);

        let params = ChainParams::default();
        let assembler = BlockAssembler::new(&params, options(), services());
        let template = assembler
            .create_new_block(&node, &[0x51], "ok", &MemoryLedger::default())
            .unwrap();
        assert_eq!(selected(&template), vec![rich.meta.txid]);
    }

    #[test]
    fn witness_excluded_when_disabled() {
        let segwit = TxBuilder::new(1).fee(5000).witness().build();
        let legacy = TxBuilder::new(2).fee(1000).build();
        let node = node(vec![segwit, legacy.clone()]);

        let params = ChainParams::default();
        let options = AssemblerOptions {
            include_witness: false,
            ..options()
        };
        let assembler = BlockAssembler::new(&params, options, services());
        let template = assembler
            .create_new_block(&node, &[0x51], "ok", &MemoryLedger::default())
            .unwrap();
        assert_eq!(selected(&template), vec![legacy.meta.txid]);
        assert_eq!(template.stats.policy_rejections, 1);
        assert!(template.coinbase_commitment.is_empty());
    }

    #[test]
    fn version_override_only_on_demand_chains() {
        let options = AssemblerOptions {
            block_version: Some(4),
            ..options()
        };
        let params = ChainParams::default();
        let assembler = BlockAssembler::new(&params, options.clone(), services());
        assert_eq!(assembler.block_version(), 0x20000000);

        let regtest = ChainParams::regtest();
        let assembler = BlockAssembler::new(&regtest, options, services());
        assert_eq!(assembler.block_version(), 4);
    }

    #[test]
    fn missing_tip_is_fatal() {
        let node = NodeState::default();
        let params = ChainParams::default();
        let assembler = BlockAssembler::new(&params, options(), services());
        let result = assembler.create_new_block(&node, &[0x51], "ok", &MemoryLedger::default());
        assert!(matches!(result, Err(AssemblyError::MissingTip)));
    }
}
