// Browse coordinator - owns the browse session and joins per-sensor fan-out replies
//
// One task holds every piece of mutable state. Requests run as spawned tasks
// and report back over a channel, tagged with the selection epoch they were
// issued for; replies from a superseded epoch are dropped on arrival.
use crate::application::aggregation::Arrival;
use crate::application::air_quality_api::AirQualityApi;
use crate::application::browse_session::{BrowseSession, Selection};
use crate::application::error::BrowseError;
use crate::application::events::BrowseEvent;
use crate::domain::chart::{ChartData, ChartSeries, TimeWindow};
use crate::domain::error::AirQualityError;
use crate::domain::measurement::MeasurementSeries;
use crate::domain::payload::{self, Payload, PayloadKind};
use crate::domain::sensor::Sensor;
use crate::domain::station::{filter_by_city, Station};
use crate::domain::statistics::{analyze, SeriesAnalysis};
use crate::infrastructure::export::{ExportedFiles, Exporter};
use crate::infrastructure::station_cache::StationCache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

/// Identifies what an in-flight request was for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTag {
    Stations { request_id: u64 },
    Sensors { epoch: u64, station_id: i64 },
    Measurements { epoch: u64, sensor_id: i64 },
}

impl RequestTag {
    fn epoch(&self) -> Option<u64> {
        match self {
            RequestTag::Stations { .. } => None,
            RequestTag::Sensors { epoch, .. } | RequestTag::Measurements { epoch, .. } => {
                Some(*epoch)
            }
        }
    }

    fn target(&self) -> String {
        match self {
            RequestTag::Stations { .. } => "station list".to_string(),
            RequestTag::Sensors { station_id, .. } => format!("sensors of station {}", station_id),
            RequestTag::Measurements { sensor_id, .. } => {
                format!("measurements of sensor {}", sensor_id)
            }
        }
    }

    fn expected_kind(&self) -> PayloadKind {
        match self {
            RequestTag::Stations { .. } => PayloadKind::StationList,
            RequestTag::Sensors { .. } => PayloadKind::SensorList,
            RequestTag::Measurements { .. } => PayloadKind::MeasurementSeries,
        }
    }
}

struct Reply {
    tag: RequestTag,
    body: Result<String, AirQualityError>,
}

type Responder<T> = oneshot::Sender<Result<T, BrowseError>>;

enum Command {
    FetchStations(Responder<usize>),
    LoadCachedStations(Responder<usize>),
    Stations {
        city: String,
        respond: Responder<Vec<Station>>,
    },
    Station {
        station_id: i64,
        respond: Responder<Station>,
    },
    Select {
        station_id: i64,
        respond: Responder<Selection>,
    },
    Refresh(Responder<Selection>),
    Parameters(Responder<Vec<String>>),
    Analyze {
        parameter: String,
        respond: Responder<SeriesAnalysis>,
    },
    Chart {
        parameters: Vec<String>,
        window: Option<TimeWindow>,
        respond: Responder<ChartData>,
    },
    Export {
        parameter: Option<String>,
        respond: Responder<Vec<ExportedFiles>>,
    },
}

/// Cloneable front door to the coordinator task
#[derive(Clone)]
pub struct BrowseHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<BrowseEvent>,
}

impl BrowseHandle {
    /// Subscribe before issuing a command to see all of its events.
    pub fn subscribe(&self) -> broadcast::Receiver<BrowseEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Responder<T>) -> Command,
    ) -> Result<T, BrowseError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| BrowseError::CoordinatorUnavailable)?;
        rx.await.map_err(|_| BrowseError::CoordinatorUnavailable)?
    }

    /// Fetch the station list from the API and refresh the cache
    pub async fn fetch_stations(&self) -> Result<usize, BrowseError> {
        self.request(Command::FetchStations).await
    }

    pub async fn load_cached_stations(&self) -> Result<usize, BrowseError> {
        self.request(Command::LoadCachedStations).await
    }

    pub async fn stations(&self, city: &str) -> Result<Vec<Station>, BrowseError> {
        let city = city.to_string();
        self.request(|respond| Command::Stations { city, respond }).await
    }

    pub async fn station(&self, station_id: i64) -> Result<Station, BrowseError> {
        self.request(|respond| Command::Station { station_id, respond })
            .await
    }

    pub async fn select_station(&self, station_id: i64) -> Result<Selection, BrowseError> {
        self.request(|respond| Command::Select { station_id, respond })
            .await
    }

    pub async fn refresh(&self) -> Result<Selection, BrowseError> {
        self.request(Command::Refresh).await
    }

    pub async fn parameters(&self) -> Result<Vec<String>, BrowseError> {
        self.request(Command::Parameters).await
    }

    pub async fn analyze(&self, parameter: &str) -> Result<SeriesAnalysis, BrowseError> {
        let parameter = parameter.to_string();
        self.request(|respond| Command::Analyze { parameter, respond })
            .await
    }

    /// Chart data for the given parameters (all received ones when empty)
    pub async fn chart(
        &self,
        parameters: Vec<String>,
        window: Option<TimeWindow>,
    ) -> Result<ChartData, BrowseError> {
        self.request(|respond| Command::Chart {
            parameters,
            window,
            respond,
        })
        .await
    }

    /// Export one parameter, or every received parameter when `None`
    pub async fn export(&self, parameter: Option<String>) -> Result<Vec<ExportedFiles>, BrowseError> {
        self.request(|respond| Command::Export { parameter, respond })
            .await
    }
}

pub struct BrowseCoordinator {
    api: Arc<dyn AirQualityApi>,
    cache: StationCache,
    exporter: Exporter,
    request_timeout: Duration,
    session: BrowseSession,
    commands: mpsc::Receiver<Command>,
    replies_tx: mpsc::UnboundedSender<Reply>,
    replies: mpsc::UnboundedReceiver<Reply>,
    events: broadcast::Sender<BrowseEvent>,
    next_request_id: u64,
    station_waiters: HashMap<u64, Responder<usize>>,
}

impl BrowseCoordinator {
    pub fn new(
        api: Arc<dyn AirQualityApi>,
        cache: StationCache,
        exporter: Exporter,
        request_timeout: Duration,
    ) -> (Self, BrowseHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (replies_tx, replies) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let handle = BrowseHandle {
            commands: commands_tx,
            events: events.clone(),
        };

        let coordinator = Self {
            api,
            cache,
            exporter,
            request_timeout,
            session: BrowseSession::new(),
            commands,
            replies_tx,
            replies,
            events,
            next_request_id: 0,
            station_waiters: HashMap::new(),
        };

        (coordinator, handle)
    }

    /// Serve commands and replies until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!("Browse coordinator started");
        loop {
            tokio::select! {
                Some(reply) = self.replies.recv() => self.handle_reply(reply).await,
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
            }
        }
        tracing::info!("Browse coordinator stopped");
    }

    fn publish(&self, event: BrowseEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn dispatch(&self, tag: RequestTag) {
        let api = Arc::clone(&self.api);
        let replies = self.replies_tx.clone();
        let timeout = self.request_timeout;

        tokio::spawn(async move {
            let request = async {
                match tag {
                    RequestTag::Stations { .. } => api.fetch_stations().await,
                    RequestTag::Sensors { station_id, .. } => api.fetch_sensors(station_id).await,
                    RequestTag::Measurements { sensor_id, .. } => {
                        api.fetch_measurements(sensor_id).await
                    }
                }
            };

            let body = match tokio::time::timeout(timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(AirQualityError::transport(
                    tag.target(),
                    format!("timed out after {:?}", timeout),
                )),
            };

            let _ = replies.send(Reply { tag, body });
        });
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::FetchStations(respond) => {
                self.next_request_id += 1;
                let request_id = self.next_request_id;
                self.station_waiters.insert(request_id, respond);
                self.dispatch(RequestTag::Stations { request_id });
            }
            Command::LoadCachedStations(respond) => {
                let result = self.load_cached_stations().await;
                let _ = respond.send(result);
            }
            Command::Stations { city, respond } => {
                let stations = filter_by_city(self.session.stations(), &city)
                    .into_iter()
                    .cloned()
                    .collect();
                let _ = respond.send(Ok(stations));
            }
            Command::Station {
                station_id,
                respond,
            } => {
                let _ = respond.send(self.session.station(station_id).cloned());
            }
            Command::Select {
                station_id,
                respond,
            } => {
                let result = self.session.select(station_id);
                let _ = respond.send(self.start_cycle(result));
            }
            Command::Refresh(respond) => {
                let result = self.session.refresh();
                let _ = respond.send(self.start_cycle(result));
            }
            Command::Parameters(respond) => {
                let _ = respond.send(Ok(self.session.parameters()));
            }
            Command::Analyze { parameter, respond } => {
                let result = self
                    .session
                    .series(&parameter)
                    .map(|series| analyze(series, &parameter));
                let _ = respond.send(result);
            }
            Command::Chart {
                parameters,
                window,
                respond,
            } => {
                let _ = respond.send(self.chart(parameters, window));
            }
            Command::Export { parameter, respond } => {
                let result = self.export(parameter).await;
                let _ = respond.send(result);
            }
        }
    }

    fn start_cycle(
        &self,
        selection: Result<Selection, BrowseError>,
    ) -> Result<Selection, BrowseError> {
        let selection = selection?;
        tracing::info!(
            "Selection cycle {} started for station {} ({})",
            selection.epoch,
            selection.station.id,
            selection.station.name
        );
        self.dispatch(RequestTag::Sensors {
            epoch: selection.epoch,
            station_id: selection.station.id,
        });
        Ok(selection)
    }

    async fn load_cached_stations(&mut self) -> Result<usize, BrowseError> {
        let stations = self.cache.load().await?;
        let count = self.session.set_stations(stations);
        tracing::info!("Loaded {} stations from {}", count, self.cache.path().display());
        self.publish(BrowseEvent::StationListReady { count });
        Ok(count)
    }

    fn chart(
        &mut self,
        parameters: Vec<String>,
        window: Option<TimeWindow>,
    ) -> Result<ChartData, BrowseError> {
        let parameters = if parameters.is_empty() {
            self.session.parameters()
        } else {
            parameters
        };
        if parameters.is_empty() {
            return Err(BrowseError::NoData("any parameter".to_string()));
        }

        let series: Vec<ChartSeries> = parameters
            .iter()
            .filter_map(|p| self.session.series(p).ok())
            .map(|s| ChartSeries::from_series(s, window.as_ref()))
            .collect();
        if series.is_empty() {
            return Err(BrowseError::NoData(parameters.join(", ")));
        }
        let chart = ChartData::build(series)?;

        let drawn: Vec<String> = chart.series.iter().map(|s| s.parameter.clone()).collect();
        self.session.claim_charts(&drawn)?;
        Ok(chart)
    }

    async fn export(&self, parameter: Option<String>) -> Result<Vec<ExportedFiles>, BrowseError> {
        let aggregation = self
            .session
            .aggregation()
            .ok_or(BrowseError::NoStationSelected)?;
        let station_id = aggregation.station_id();

        let series: Vec<MeasurementSeries> = match parameter {
            Some(p) => vec![self.session.series(&p)?.clone()],
            None => aggregation.all_series().cloned().collect(),
        };
        if series.is_empty() {
            return Err(BrowseError::NoData("any parameter".to_string()));
        }

        let mut exported = Vec::with_capacity(series.len());
        for s in &series {
            match self.exporter.export(station_id, s).await {
                Ok(files) => exported.push(files),
                Err(e) => {
                    tracing::warn!("Export of {} failed: {}", s.parameter, e);
                    if let AirQualityError::FileIo { path, .. } = &e {
                        self.publish(BrowseEvent::StorageFailed {
                            path: path.display().to_string(),
                            message: e.to_string(),
                        });
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(exported)
    }

    async fn handle_reply(&mut self, reply: Reply) {
        let tag = reply.tag;
        if let Some(epoch) = tag.epoch() {
            if !self.session.is_current(epoch) {
                tracing::debug!(
                    "Discarding stale reply for {} (epoch {}, current {})",
                    tag.target(),
                    epoch,
                    self.session.epoch()
                );
                return;
            }
        }

        let payload = match reply.body {
            Ok(body) => payload::parse(&body),
            Err(e) => Err(e),
        }
        .and_then(|payload| match payload {
            Payload::Unknown(reason) => Err(AirQualityError::Classification(reason)),
            // An empty list in reply to the station request is just no stations
            Payload::SensorList(sensors)
                if sensors.is_empty() && tag.expected_kind() == PayloadKind::StationList =>
            {
                Ok(Payload::StationList(Vec::new()))
            }
            payload if payload.kind() != tag.expected_kind() => {
                Err(AirQualityError::Classification(format!(
                    "expected {} for {}, got {}",
                    tag.expected_kind(),
                    tag.target(),
                    payload.kind()
                )))
            }
            payload => Ok(payload),
        });

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                self.on_failed_reply(tag, e);
                return;
            }
        };

        match (tag, payload) {
            (RequestTag::Stations { request_id }, Payload::StationList(stations)) => {
                self.on_station_list(request_id, stations).await
            }
            (RequestTag::Sensors { epoch, station_id }, Payload::SensorList(sensors)) => {
                self.on_sensor_list(epoch, station_id, sensors)
            }
            (RequestTag::Measurements { epoch, sensor_id }, Payload::MeasurementSeries(series)) => {
                self.on_series(epoch, sensor_id, series)
            }
            // Kinds were matched against the tag above
            (tag, payload) => {
                tracing::error!("Unroutable {} reply for {}", payload.kind(), tag.target())
            }
        }
    }

    fn on_failed_reply(&mut self, tag: RequestTag, error: AirQualityError) {
        tracing::warn!("Reply for {} rejected: {}", tag.target(), error);

        let event = match &error {
            AirQualityError::Transport { target, message } => BrowseEvent::FetchFailed {
                epoch: tag.epoch(),
                target: target.clone(),
                message: message.clone(),
            },
            _ => BrowseEvent::UnknownFormat {
                epoch: tag.epoch(),
                message: format!("{}: {}", tag.target(), error),
            },
        };
        self.publish(event);

        match tag {
            RequestTag::Stations { request_id } => {
                if let Some(respond) = self.station_waiters.remove(&request_id) {
                    let _ = respond.send(Err(error.into()));
                }
            }
            RequestTag::Sensors { epoch, station_id } => {
                self.publish(BrowseEvent::CycleAborted { epoch, station_id });
            }
            RequestTag::Measurements { epoch, sensor_id } => {
                let arrival = match self.session.aggregation_for(epoch) {
                    Some(aggregation) => aggregation.record_failure(sensor_id),
                    None => Arrival::Ignored,
                };
                self.on_arrival(epoch, sensor_id, arrival);
            }
        }
    }

    async fn on_station_list(&mut self, request_id: u64, stations: Vec<Station>) {
        // Only a station list ever reaches the cache
        if let Err(e) = self.cache.store(&stations).await {
            tracing::warn!("Could not cache station list: {}", e);
            self.publish(BrowseEvent::StorageFailed {
                path: self.cache.path().display().to_string(),
                message: e.to_string(),
            });
        }

        let count = self.session.set_stations(stations);
        tracing::info!("Fetched {} stations", count);
        self.publish(BrowseEvent::StationListReady { count });

        if let Some(respond) = self.station_waiters.remove(&request_id) {
            let _ = respond.send(Ok(count));
        }
    }

    fn on_sensor_list(&mut self, epoch: u64, station_id: i64, sensors: Vec<Sensor>) {
        let Some(aggregation) = self.session.aggregation_for(epoch) else {
            return;
        };
        let Some(sensor_ids) = aggregation.expect_sensors(sensors.iter().map(|s| s.id)) else {
            tracing::debug!("Duplicate sensor list for epoch {} ignored", epoch);
            return;
        };

        tracing::info!(
            "Station {} has {} sensors, fetching measurements",
            station_id,
            sensor_ids.len()
        );
        self.publish(BrowseEvent::SensorCountKnown {
            epoch,
            station_id,
            count: sensor_ids.len(),
        });

        for sensor_id in sensor_ids {
            self.dispatch(RequestTag::Measurements { epoch, sensor_id });
        }
    }

    fn on_series(&mut self, epoch: u64, sensor_id: i64, series: MeasurementSeries) {
        let parameter = series.parameter.clone();
        let arrival = match self.session.aggregation_for(epoch) {
            Some(aggregation) => aggregation.record_series(sensor_id, series),
            None => Arrival::Ignored,
        };

        if let Arrival::Accepted {
            excerpt: Some(excerpt),
            ..
        } = &arrival
        {
            self.publish(BrowseEvent::ExcerptReady {
                epoch,
                parameter,
                excerpt: excerpt.clone(),
            });
        }
        self.on_arrival(epoch, sensor_id, arrival);
    }

    fn on_arrival(&mut self, epoch: u64, sensor_id: i64, arrival: Arrival) {
        match arrival {
            Arrival::Ignored => {
                tracing::debug!("Reply for sensor {} is not pending, ignored", sensor_id);
            }
            Arrival::Accepted { batch: None, .. } => {}
            Arrival::Accepted {
                batch: Some(batch), ..
            } => {
                let station_id = self
                    .session
                    .aggregation()
                    .map(|a| a.station_id())
                    .unwrap_or_default();
                tracing::info!(
                    "Selection cycle {} complete: {} series, {} failed",
                    epoch,
                    batch.received,
                    batch.failed
                );
                self.publish(BrowseEvent::AggregationComplete {
                    epoch,
                    station_id,
                    summary: batch.summary,
                    parameters: batch.parameters,
                    failed: batch.failed,
                });
            }
        }
    }
}
