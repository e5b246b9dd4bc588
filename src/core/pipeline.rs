use std::collections::BTreeMap;
use std::io::Read;

use async_trait::async_trait;
use reqwest::Client;

use crate::analysis::{match_edges, MatchParams};
use crate::core::{AnalysisResult, AuthorityJob, ConfigProvider, Pipeline, Storage, SurveyData};
use crate::domain::model::{EdgeClass, GraphChunk, TracePoint};
use crate::geo::{densify, BoundingBox, Point, PointGrid};
use crate::gpx;
use crate::osm::{Geocoder, OverpassClient};
use crate::output;
use crate::utils::error::{ProwError, Result};

/// Public GPS extracts can be large; downloads identify as a browser the way
/// the rowmaps endpoint expects.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.12; rv:55.0) Gecko/20100101 Firefox/55.0";

/// Buffer applied around the geocoded authority boundary, metres.
const BOUNDARY_BUFFER_M: f64 = 10.0;

/// Track ids of separate trace files must not collide.
const TRACK_ID_STRIDE: u64 = 1_000_000;

pub struct ProwPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    job: AuthorityJob,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> ProwPipeline<S, C> {
    pub fn new(storage: S, config: C, job: AuthorityJob) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            storage,
            config,
            job,
            client,
        })
    }

    pub fn job(&self) -> &AuthorityJob {
        &self.job
    }

    fn row_cache_path(&self) -> String {
        format!("{}/row/{}.csv", self.config.data_dir(), self.job.code)
    }

    fn public_cache_path(&self) -> String {
        format!("{}/public/{}.csv", self.config.data_dir(), self.job.region)
    }

    fn bounds_cache_path(&self) -> String {
        format!("{}/graphs/{}_bounds.json", self.config.data_dir(), self.job.code)
    }

    fn chunk_cache_path(&self, index: usize) -> String {
        format!("{}/graphs/{}_{}.json", self.config.data_dir(), self.job.code, index)
    }

    /// Whether all outputs for this authority already exist, in which case
    /// the whole run can be skipped.
    pub async fn outputs_exist(&self) -> bool {
        for file in output::output_files(&self.job.code) {
            let path = format!("{}/{}", self.config.output_dir(), file);
            if !self.storage.exists(&path).await {
                return false;
            }
        }
        true
    }

    async fn read_point_cache(&self, path: &str) -> Result<Vec<TracePoint>> {
        let bytes = self.storage.read_file(path).await?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let mut points = Vec::new();
        for record in reader.deserialize() {
            points.push(record?);
        }
        Ok(points)
    }

    async fn write_point_cache(&self, path: &str, points: &[TracePoint]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for point in points {
            writer.serialize(point)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(std::io::Error::other(e.to_string())))?;
        self.storage.write_file(path, &bytes).await
    }

    /// Download the official rights-of-way network as GPX and flatten it to
    /// points, or reuse the cached conversion.
    async fn fetch_row_points(&self) -> Result<Vec<TracePoint>> {
        let cache = self.row_cache_path();
        if self.storage.exists(&cache).await {
            tracing::info!("RoW data found at {}", cache);
            if let Ok(points) = self.read_point_cache(&cache).await {
                return Ok(points);
            }
            tracing::warn!("RoW cache at {} unreadable, re-downloading", cache);
        }

        tracing::info!("Downloading RoW data for {}", self.job.code);
        let response = self
            .client
            .get(self.config.row_endpoint())
            .query(&[("l", self.job.code.as_str()), ("w", "no")])
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?;
        let tracks = gpx::parse_gpx(&body)?;
        if tracks.is_empty() {
            return Err(ProwError::GpxError {
                message: format!("RoW download for {} contains no tracks", self.job.code),
            });
        }

        let points = gpx::tracks_to_points(&tracks, 0);
        self.write_point_cache(&cache, &points).await?;
        Ok(points)
    }

    /// Download the public trace archive for the region (a ZIP of GPX files)
    /// and flatten every file, or reuse the cached conversion.
    async fn fetch_public_points(&self) -> Result<Vec<TracePoint>> {
        let cache = self.public_cache_path();
        if self.storage.exists(&cache).await {
            tracing::info!("Public GPS data found at {}", cache);
            if let Ok(points) = self.read_point_cache(&cache).await {
                return Ok(points);
            }
            tracing::warn!("Public cache at {} unreadable, re-downloading", cache);
        }

        let url = format!("{}/{}.zip", self.config.traces_endpoint(), self.job.region);
        tracing::info!("Downloading public GPS archive from {}", url);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body = response.bytes().await?;

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(body.as_ref()))?;
        let mut points = Vec::new();
        let mut file_idx: u64 = 0;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if !entry.name().ends_with(".gpx") {
                continue;
            }

            let mut contents = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut contents)?;

            let tracks = gpx::parse_gpx(&contents)?;
            points.extend(gpx::tracks_to_points(&tracks, file_idx * TRACK_ID_STRIDE));
            file_idx += 1;
        }

        tracing::info!("Converted {} public trace points from {} files", points.len(), file_idx);
        self.write_point_cache(&cache, &points).await?;
        Ok(points)
    }

    /// Geocode the authority and cut its boundary into analysis chunks,
    /// reusing the cached boundary when present.
    async fn chunk_boundaries(&self) -> Result<Vec<BoundingBox>> {
        let cache = self.bounds_cache_path();
        if self.storage.exists(&cache).await {
            if let Ok(bytes) = self.storage.read_file(&cache).await {
                if let Ok(bounds) = serde_json::from_slice::<Vec<BoundingBox>>(&bytes) {
                    tracing::info!("Boundary found at {}", cache);
                    return Ok(bounds);
                }
            }
            tracing::warn!("Boundary cache at {} unreadable, re-geocoding", cache);
        }

        let geocoder = Geocoder::new(self.client.clone(), self.config.geocode_endpoint());
        let bbox = geocoder.bounding_box(&self.job.authority).await?;
        let chunks = bbox
            .buffered(BOUNDARY_BUFFER_M)
            .split(self.config.chunk_length_m());

        tracing::info!("Boundary of {} split into {} chunks", self.job.authority, chunks.len());
        self.storage
            .write_file(&cache, &serde_json::to_vec(&chunks)?)
            .await?;
        Ok(chunks)
    }

    /// Download the way network for every chunk, at most
    /// `concurrent_requests` downloads in flight.
    async fn fetch_graph_chunks(&self, bounds: &[BoundingBox]) -> Result<Vec<GraphChunk>> {
        let mut chunks: BTreeMap<usize, GraphChunk> = BTreeMap::new();
        let mut missing = Vec::new();

        for (index, bbox) in bounds.iter().enumerate() {
            let cache = self.chunk_cache_path(index);
            if self.storage.exists(&cache).await {
                if let Ok(bytes) = self.storage.read_file(&cache).await {
                    if let Ok(chunk) = serde_json::from_slice::<GraphChunk>(&bytes) {
                        chunks.insert(index, chunk);
                        continue;
                    }
                }
                tracing::warn!("Chunk cache {} unreadable, re-downloading", cache);
            }
            missing.push((index, *bbox));
        }

        if !missing.is_empty() {
            tracing::info!("Downloading way network for {} chunks", missing.len());
        }

        let window = self.config.concurrent_requests().max(1);
        for batch in missing.chunks(window) {
            let mut join_set = tokio::task::JoinSet::new();
            for &(index, bbox) in batch {
                let overpass =
                    OverpassClient::new(self.client.clone(), self.config.overpass_endpoint());
                join_set.spawn(async move {
                    let ways = overpass.fetch_ways(&bbox).await?;
                    Ok::<_, ProwError>(GraphChunk { index, ways })
                });
            }

            while let Some(joined) = join_set.join_next().await {
                let chunk = joined.map_err(|e| ProwError::AnalysisError {
                    stage: "graph download".to_string(),
                    details: e.to_string(),
                })??;

                self.storage
                    .write_file(&self.chunk_cache_path(chunk.index), &serde_json::to_vec(&chunk)?)
                    .await?;
                chunks.insert(chunk.index, chunk);
            }
        }

        Ok(chunks.into_values().collect())
    }
}

/// Densify every track of a point set so the match grids see evenly spaced
/// samples regardless of recording rate.
fn interpolate_points(points: &[TracePoint], spacing_m: f64) -> Vec<Point> {
    let mut by_track: BTreeMap<u64, Vec<Point>> = BTreeMap::new();
    for p in points {
        by_track.entry(p.trackid).or_default().push(p.point());
    }

    let mut out = Vec::with_capacity(points.len());
    for track in by_track.values() {
        out.extend(densify(track, spacing_m));
    }
    out
}

#[async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ProwPipeline<S, C> {
    async fn extract(&self) -> Result<SurveyData> {
        tracing::info!(
            "1. RoW network for '{}' ({})",
            self.job.authority,
            self.job.code
        );
        let row_points = self.fetch_row_points().await?;

        tracing::info!("2. Public GPS traces for region '{}'", self.job.region);
        let public_points = self.fetch_public_points().await?;

        tracing::info!("3. Way network chunks");
        let bounds = self.chunk_boundaries().await?;
        let chunks = self.fetch_graph_chunks(&bounds).await?;

        Ok(SurveyData {
            authority_code: self.job.code.clone(),
            row_points,
            public_points,
            chunks,
        })
    }

    async fn transform(&self, data: SurveyData) -> Result<AnalysisResult> {
        let spacing = self.config.sample_spacing_m();
        let radius = self.config.match_radius_m();

        let row_samples = interpolate_points(&data.row_points, spacing);
        let public_samples = interpolate_points(&data.public_points, spacing);
        tracing::debug!(
            "Interpolated to {} RoW and {} public samples",
            row_samples.len(),
            public_samples.len()
        );

        let row_grid = PointGrid::build(&row_samples, radius);
        let public_grid = PointGrid::build(&public_samples, radius);

        let graph = crate::osm::graph::build_graph(&data.chunks);
        tracing::debug!(
            "Way network has {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        let params = MatchParams {
            sample_spacing_m: spacing,
            match_radius_m: radius,
            row_coverage: self.config.row_coverage(),
        };
        let (edges, counts) = match_edges(&graph, &row_grid, &public_grid, &params);

        Ok(AnalysisResult {
            authority_code: data.authority_code,
            edges,
            counts,
        })
    }

    async fn load(&self, result: AnalysisResult) -> Result<String> {
        let code = &result.authority_code;

        for class in [EdgeClass::Both, EdgeClass::PublicOnly, EdgeClass::RowOnly] {
            let collection = output::feature_collection(&result.edges, class);
            let path = format!("{}/{}/{}.geojson", self.config.output_dir(), code, class.letter());
            self.storage
                .write_file(&path, &serde_json::to_vec_pretty(&collection)?)
                .await?;
        }

        let csv_path = format!("{}/{}/edges.csv", self.config.output_dir(), code);
        let csv = output::edges_csv(&result.edges)?;
        self.storage.write_file(&csv_path, csv.as_bytes()).await?;

        Ok(format!("{}/{}", self.config.output_dir(), code))
    }
}
