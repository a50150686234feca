use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{BotError, Result};

use super::node::{ChallengeRotation, CoopRotation, CurrentFest, FestState, Rotation, VsRotation};
use super::time_period::{PoppingTimePeriodCollection, TimePeriod, Timed};
use super::RotationSet;

const SCHEDULE_ENDPOINT: &str = "https://splatoon3.ink/data/schedules.json";
const API_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!(
    "ikabot/",
    env!("CARGO_PKG_VERSION"),
    " (Discord rotation bot)"
);

#[derive(Debug)]
pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(API_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// One GET against the schedule endpoint. Non-2xx and transport failures
    /// are fatal for this attempt; the caller keeps serving its in-memory
    /// state and tries again at the next boundary.
    pub async fn fetch_raw(&self) -> Result<Value> {
        let response = self.client.get(SCHEDULE_ENDPOINT).send().await?;
        Ok(response.error_for_status()?.json().await?)
    }
}

// The upstream shape, kept permissive on purpose: every setting is optional
// and every list defaults to empty, so a partially drifted payload still
// classifies. Only structurally broken nodes (missing timestamps) fail hard.

#[derive(Debug, Default, Deserialize)]
struct ScheduleFeed {
    #[serde(default)]
    data: ScheduleData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleData {
    #[serde(default)]
    regular_schedules: NodeList<RegularNode>,
    #[serde(default)]
    bankara_schedules: NodeList<BankaraNode>,
    #[serde(default)]
    x_schedules: NodeList<XNode>,
    #[serde(default)]
    event_schedules: NodeList<EventNode>,
    #[serde(default)]
    fest_schedules: NodeList<FestNode>,
    #[serde(default)]
    coop_grouping_schedule: CoopGroupingSchedule,
    #[serde(default)]
    current_fest: Option<CurrentFestNode>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct NodeList<T> {
    #[serde(default)]
    nodes: Vec<T>,
}

impl<T> Default for NodeList<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchSetting {
    #[serde(default)]
    vs_rule: Option<NamedRef>,
    #[serde(default)]
    vs_stages: Vec<NamedRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegularNode {
    start_time: String,
    end_time: String,
    #[serde(default)]
    regular_match_setting: Option<MatchSetting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankaraNode {
    start_time: String,
    end_time: String,
    #[serde(default)]
    bankara_match_settings: Option<Vec<BankaraSetting>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankaraSetting {
    #[serde(default)]
    bankara_mode: String,
    #[serde(flatten)]
    setting: MatchSetting,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct XNode {
    start_time: String,
    end_time: String,
    #[serde(default)]
    x_match_setting: Option<MatchSetting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventNode {
    start_time: String,
    end_time: String,
    #[serde(default)]
    event_match_setting: Option<EventSetting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventSetting {
    #[serde(default)]
    league_match_event: Option<LeagueMatchEvent>,
    #[serde(flatten)]
    setting: MatchSetting,
}

#[derive(Debug, Deserialize)]
struct LeagueMatchEvent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    desc: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FestNode {
    start_time: String,
    end_time: String,
    #[serde(default)]
    fest_match_settings: Option<Vec<FestSetting>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FestSetting {
    #[serde(default)]
    fest_mode: String,
    #[serde(flatten)]
    setting: MatchSetting,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoopGroupingSchedule {
    #[serde(default)]
    regular_schedules: NodeList<CoopNode>,
    #[serde(default)]
    big_run_schedules: NodeList<CoopNode>,
    #[serde(default)]
    team_contest_schedules: NodeList<CoopNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoopNode {
    start_time: String,
    end_time: String,
    #[serde(default)]
    setting: Option<CoopSetting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoopSetting {
    #[serde(default)]
    coop_stage: Option<NamedRef>,
    #[serde(default)]
    weapons: Vec<NamedRef>,
    #[serde(default)]
    boss: Option<NamedRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentFestNode {
    #[serde(default)]
    title: String,
    #[serde(default)]
    state: String,
    start_time: String,
    end_time: String,
    #[serde(default)]
    tricolor_stages: Vec<NamedRef>,
}

/// Structural check of the raw payload against the shape we expect.
///
/// A failure here is a diagnostic, not a dead stop: the upstream API drifts
/// from time to time and the bot keeps interpreting the payload best-effort
/// rather than going offline.
pub(crate) fn validate(raw: &Value) -> Result<()> {
    let Some(data) = raw.get("data").and_then(Value::as_object) else {
        return Err(BotError::Feed("missing top-level `data` object".into()));
    };

    let mut missing = Vec::new();
    for key in [
        "regularSchedules",
        "bankaraSchedules",
        "xSchedules",
        "eventSchedules",
        "festSchedules",
    ] {
        let nodes = data
            .get(key)
            .and_then(|section| section.get("nodes"))
            .and_then(Value::as_array);
        if nodes.is_none() {
            missing.push(key);
        }
    }
    if data
        .get("coopGroupingSchedule")
        .and_then(Value::as_object)
        .is_none()
    {
        missing.push("coopGroupingSchedule");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(BotError::Feed(format!(
            "missing or malformed sections: {}",
            missing.join(", ")
        )))
    }
}

fn vs_rotation(period: TimePeriod, setting: &MatchSetting) -> VsRotation {
    VsRotation {
        period,
        rule: setting
            .vs_rule
            .as_ref()
            .map(|rule| rule.name.clone())
            .unwrap_or_else(|| "Unknown".into()),
        stages: setting.vs_stages.iter().map(|s| s.name.clone()).collect(),
    }
}

fn classify_regular(nodes: &[RegularNode]) -> Result<Vec<Option<Rotation>>> {
    nodes
        .iter()
        .map(|node| {
            let Some(setting) = &node.regular_match_setting else {
                return Ok(None);
            };
            let period = TimePeriod::parse(&node.start_time, &node.end_time)?;
            Ok(Some(Rotation::TurfWar(vs_rotation(period, setting))))
        })
        .collect()
}

/// Each bankara node carries up to two settings; `mode` picks the one we
/// want so series and open stay index-aligned with each other.
fn classify_bankara(
    nodes: &[BankaraNode],
    mode: &str,
    wrap: fn(VsRotation) -> Rotation,
) -> Result<Vec<Option<Rotation>>> {
    nodes
        .iter()
        .map(|node| {
            let setting = node
                .bankara_match_settings
                .as_deref()
                .and_then(|settings| settings.iter().find(|s| s.bankara_mode == mode));
            let Some(setting) = setting else {
                return Ok(None);
            };
            let period = TimePeriod::parse(&node.start_time, &node.end_time)?;
            Ok(Some(wrap(vs_rotation(period, &setting.setting))))
        })
        .collect()
}

fn classify_x(nodes: &[XNode]) -> Result<Vec<Option<Rotation>>> {
    nodes
        .iter()
        .map(|node| {
            let Some(setting) = &node.x_match_setting else {
                return Ok(None);
            };
            let period = TimePeriod::parse(&node.start_time, &node.end_time)?;
            Ok(Some(Rotation::XBattle(vs_rotation(period, setting))))
        })
        .collect()
}

fn classify_events(nodes: &[EventNode]) -> Result<Vec<Option<Rotation>>> {
    nodes
        .iter()
        .map(|node| {
            let Some(setting) = &node.event_match_setting else {
                return Ok(None);
            };
            let period = TimePeriod::parse(&node.start_time, &node.end_time)?;
            let (name, description) = setting
                .league_match_event
                .as_ref()
                .map(|event| (event.name.clone(), event.desc.clone()))
                .unwrap_or_default();
            let base = vs_rotation(period, &setting.setting);
            Ok(Some(Rotation::Challenge(ChallengeRotation {
                period: base.period,
                name,
                description,
                rule: base.rule,
                stages: base.stages,
            })))
        })
        .collect()
}

fn classify_fest(
    nodes: &[FestNode],
    mode: &str,
    wrap: fn(VsRotation) -> Rotation,
) -> Result<Vec<Option<Rotation>>> {
    nodes
        .iter()
        .map(|node| {
            let setting = node
                .fest_match_settings
                .as_deref()
                .and_then(|settings| settings.iter().find(|s| s.fest_mode == mode));
            let Some(setting) = setting else {
                return Ok(None);
            };
            let period = TimePeriod::parse(&node.start_time, &node.end_time)?;
            Ok(Some(wrap(vs_rotation(period, &setting.setting))))
        })
        .collect()
}

fn classify_coop(
    nodes: &[CoopNode],
    wrap: fn(CoopRotation) -> Rotation,
) -> Result<Vec<Option<Rotation>>> {
    nodes
        .iter()
        .map(|node| {
            let Some(setting) = &node.setting else {
                return Ok(None);
            };
            let period = TimePeriod::parse(&node.start_time, &node.end_time)?;
            Ok(Some(wrap(CoopRotation {
                period,
                stage: setting
                    .coop_stage
                    .as_ref()
                    .map(|stage| stage.name.clone())
                    .unwrap_or_else(|| "Unknown".into()),
                weapons: setting.weapons.iter().map(|w| w.name.clone()).collect(),
                king_salmonid: setting.boss.as_ref().map(|boss| boss.name.clone()),
            })))
        })
        .collect()
}

fn classify_current_fest(node: &CurrentFestNode) -> Result<Option<CurrentFest>> {
    let state = match node.state.as_str() {
        "FIRST_HALF" => FestState::FirstHalf,
        "SECOND_HALF" => FestState::SecondHalf,
        _ => return Ok(None),
    };
    let period = TimePeriod::parse(&node.start_time, &node.end_time)?;
    Ok(Some(CurrentFest {
        period,
        title: node.title.clone(),
        state,
        tricolor_stages: node.tricolor_stages.iter().map(|s| s.name.clone()).collect(),
    }))
}

/// Min start / min end across the currently active entries of the given
/// collections. The min end is when the next refresh is due.
fn versus_window(
    collections: &[&PoppingTimePeriodCollection<Rotation>],
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let active: Vec<&Rotation> = collections.iter().filter_map(|c| c.active()).collect();
    let start = active.iter().map(|r| r.time_period().start_time()).min();
    let end = active.iter().map(|r| r.time_period().end_time()).min();
    (start, end)
}

fn salmon_window(
    collections: &[&PoppingTimePeriodCollection<Rotation>],
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let active: Vec<&Rotation> = collections.iter().filter_map(|c| c.active()).collect();
    // Both boundaries read end times. Refresh scheduling and change
    // detection only ever consume the end boundary, so the start value is
    // unused today.
    // TODO: derive the salmon start boundary from start times once a
    // consumer actually needs it.
    let start = active.iter().map(|r| r.time_period().end_time()).min();
    let end = active.iter().map(|r| r.time_period().end_time()).min();
    (start, end)
}

/// Classify the raw payload into per-category collections plus the window
/// boundaries. Entries whose category setting is null become absent slots at
/// the same index, keeping sibling categories positionally aligned.
pub(crate) fn interpret(raw: &Value) -> Result<RotationSet> {
    let feed: ScheduleFeed = serde_json::from_value(raw.clone())?;
    let data = feed.data;

    let turf_war = PoppingTimePeriodCollection::new(classify_regular(&data.regular_schedules.nodes)?);
    let ranked_series = PoppingTimePeriodCollection::new(classify_bankara(
        &data.bankara_schedules.nodes,
        "CHALLENGE",
        Rotation::RankedSeries,
    )?);
    let ranked_open = PoppingTimePeriodCollection::new(classify_bankara(
        &data.bankara_schedules.nodes,
        "OPEN",
        Rotation::RankedOpen,
    )?);
    let x_battle = PoppingTimePeriodCollection::new(classify_x(&data.x_schedules.nodes)?);
    let challenge = PoppingTimePeriodCollection::new(classify_events(&data.event_schedules.nodes)?);
    let splatfest_open = PoppingTimePeriodCollection::new(classify_fest(
        &data.fest_schedules.nodes,
        "REGULAR",
        Rotation::SplatfestOpen,
    )?);
    let splatfest_pro = PoppingTimePeriodCollection::new(classify_fest(
        &data.fest_schedules.nodes,
        "CHALLENGE",
        Rotation::SplatfestPro,
    )?);

    let coop = data.coop_grouping_schedule;
    let salmon_run =
        PoppingTimePeriodCollection::new(classify_coop(&coop.regular_schedules.nodes, Rotation::SalmonRun)?);
    let big_run =
        PoppingTimePeriodCollection::new(classify_coop(&coop.big_run_schedules.nodes, Rotation::BigRun)?);
    let eggstra_work = PoppingTimePeriodCollection::new(classify_coop(
        &coop.team_contest_schedules.nodes,
        Rotation::EggstraWork,
    )?);

    let current_fest = match &data.current_fest {
        Some(node) => classify_current_fest(node)?,
        None => None,
    };

    let (start_time, end_time) = versus_window(&[&turf_war, &splatfest_open, &splatfest_pro]);
    let (salmon_start_time, salmon_end_time) = salmon_window(&[&salmon_run, &big_run, &eggstra_work]);

    Ok(RotationSet {
        turf_war,
        ranked_series,
        ranked_open,
        x_battle,
        splatfest_open,
        splatfest_pro,
        challenge,
        salmon_run,
        big_run,
        eggstra_work,
        current_fest,
        start_time,
        end_time,
        salmon_start_time,
        salmon_end_time,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, SecondsFormat};
    use serde_json::json;

    pub(crate) fn iso(offset_secs: i64) -> String {
        (Utc::now() + Duration::seconds(offset_secs)).to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn stage_list() -> Value {
        json!([{ "name": "Scorch Gorge" }, { "name": "Eeltail Alley" }])
    }

    /// A structurally complete feed with one active slot and one future slot
    /// in every versus category, plus an active salmon shift.
    pub(crate) fn sample_feed(salmon_end_secs: i64) -> Value {
        json!({
            "data": {
                "regularSchedules": { "nodes": [
                    {
                        "startTime": iso(-3600), "endTime": iso(3600),
                        "regularMatchSetting": { "vsRule": { "name": "Turf War" }, "vsStages": stage_list() }
                    },
                    {
                        "startTime": iso(3600), "endTime": iso(7200),
                        "regularMatchSetting": { "vsRule": { "name": "Turf War" }, "vsStages": stage_list() }
                    }
                ]},
                "bankaraSchedules": { "nodes": [
                    {
                        "startTime": iso(-3600), "endTime": iso(3600),
                        "bankaraMatchSettings": [
                            { "bankaraMode": "CHALLENGE", "vsRule": { "name": "Splat Zones" }, "vsStages": stage_list() },
                            { "bankaraMode": "OPEN", "vsRule": { "name": "Tower Control" }, "vsStages": stage_list() }
                        ]
                    },
                    {
                        "startTime": iso(3600), "endTime": iso(7200),
                        "bankaraMatchSettings": null
                    }
                ]},
                "xSchedules": { "nodes": [
                    {
                        "startTime": iso(-3600), "endTime": iso(3600),
                        "xMatchSetting": { "vsRule": { "name": "Rainmaker" }, "vsStages": stage_list() }
                    }
                ]},
                "eventSchedules": { "nodes": [
                    {
                        "startTime": iso(-3600), "endTime": iso(3600),
                        "eventMatchSetting": null
                    },
                    {
                        "startTime": iso(3600), "endTime": iso(7200),
                        "eventMatchSetting": {
                            "leagueMatchEvent": { "name": "Monthly Challenge", "desc": "New weapons only" },
                            "vsRule": { "name": "Clam Blitz" },
                            "vsStages": stage_list()
                        }
                    }
                ]},
                "festSchedules": { "nodes": [
                    { "startTime": iso(-3600), "endTime": iso(3600), "festMatchSettings": null }
                ]},
                "coopGroupingSchedule": {
                    "regularSchedules": { "nodes": [
                        {
                            "startTime": iso(-7200), "endTime": iso(salmon_end_secs),
                            "setting": {
                                "coopStage": { "name": "Spawning Grounds" },
                                "weapons": [{ "name": "Splattershot" }, { "name": "Splat Roller" }],
                                "boss": { "name": "Cohozuna" }
                            }
                        }
                    ]},
                    "bigRunSchedules": { "nodes": [] },
                    "teamContestSchedules": { "nodes": [] }
                },
                "currentFest": null
            }
        })
    }

    #[test]
    fn classifies_every_category() {
        let set = interpret(&sample_feed(7200)).unwrap();

        match set.turf_war.active() {
            Some(Rotation::TurfWar(vs)) => {
                assert_eq!(vs.rule, "Turf War");
                assert_eq!(vs.stages, vec!["Scorch Gorge", "Eeltail Alley"]);
            }
            other => panic!("expected active turf war, got {:?}", other),
        }
        match set.ranked_series.active() {
            Some(Rotation::RankedSeries(vs)) => assert_eq!(vs.rule, "Splat Zones"),
            other => panic!("expected active series, got {:?}", other),
        }
        match set.ranked_open.active() {
            Some(Rotation::RankedOpen(vs)) => assert_eq!(vs.rule, "Tower Control"),
            other => panic!("expected active open, got {:?}", other),
        }
        assert!(matches!(set.x_battle.active(), Some(Rotation::XBattle(_))));
        match set.salmon_run.active() {
            Some(Rotation::SalmonRun(coop)) => {
                assert_eq!(coop.stage, "Spawning Grounds");
                assert_eq!(coop.king_salmonid.as_deref(), Some("Cohozuna"));
            }
            other => panic!("expected active salmon run, got {:?}", other),
        }
    }

    #[test]
    fn null_settings_become_absent_slots() {
        let set = interpret(&sample_feed(7200)).unwrap();

        // Challenge slot 0 has a null setting; slot 1 carries the event.
        assert_eq!(set.challenge.len(), 2);
        assert!(set.challenge.iter().next().unwrap().is_none());
        assert!(set.challenge.active().is_none());
        let upcoming = set.challenge.future(None);
        assert_eq!(upcoming.len(), 1);
        match upcoming[0] {
            Rotation::Challenge(event) => assert_eq!(event.name, "Monthly Challenge"),
            other => panic!("expected challenge, got {:?}", other),
        }

        // Bankara slot 1 has null settings, preserved positionally in both
        // derived categories.
        assert_eq!(set.ranked_series.len(), 2);
        assert_eq!(set.ranked_open.len(), 2);
        assert!(set.ranked_series.iter().nth(1).unwrap().is_none());
    }

    #[test]
    fn window_boundaries_track_the_active_entries() {
        let set = interpret(&sample_feed(7200)).unwrap();

        let turf_period = set.turf_war.active().unwrap().time_period().clone();
        assert_eq!(set.start_time, Some(turf_period.start_time()));
        assert_eq!(set.end_time, Some(turf_period.end_time()));
    }

    #[test]
    fn salmon_window_reads_end_times_for_both_boundaries() {
        let set = interpret(&sample_feed(7200)).unwrap();

        let shift_end = set.salmon_run.active().unwrap().time_period().end_time();
        assert_eq!(set.salmon_end_time, Some(shift_end));
        assert_eq!(set.salmon_start_time, Some(shift_end));
    }

    #[test]
    fn drifted_payload_fails_validation_but_still_classifies() {
        let mut raw = sample_feed(7200);
        raw["data"]
            .as_object_mut()
            .unwrap()
            .remove("xSchedules");

        assert!(validate(&raw).is_err());

        // Best-effort interpretation proceeds regardless.
        let set = interpret(&raw).unwrap();
        assert!(set.x_battle.is_empty());
        assert!(set.turf_war.active().is_some());
    }

    #[test]
    fn payload_without_data_object_fails_validation() {
        assert!(validate(&json!({ "errors": [] })).is_err());
    }

    #[test]
    fn current_fest_requires_a_running_half() {
        let mut raw = sample_feed(7200);
        raw["data"]["currentFest"] = json!({
            "title": "Gear vs. Grub vs. Fun",
            "state": "SCHEDULED",
            "startTime": iso(3600),
            "endTime": iso(90_000),
            "tricolorStages": [{ "name": "Undertow Spillway" }]
        });
        assert!(interpret(&raw).unwrap().current_fest.is_none());

        raw["data"]["currentFest"]["state"] = json!("FIRST_HALF");
        let fest = interpret(&raw).unwrap().current_fest.unwrap();
        assert_eq!(fest.title, "Gear vs. Grub vs. Fun");
        assert_eq!(fest.state, FestState::FirstHalf);
        assert_eq!(fest.tricolor_stages, vec!["Undertow Spillway"]);
    }

    #[test]
    fn malformed_timestamps_are_fatal() {
        let mut raw = sample_feed(7200);
        raw["data"]["regularSchedules"]["nodes"][0]["startTime"] = json!("yesterday-ish");
        assert!(interpret(&raw).is_err());
    }
}
