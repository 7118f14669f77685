use anyhow::Result;
use approx::abs_diff_eq;
use mask_rcnn_dl::eval::{
    load_results, save_results, CocoEvaluator, CocoRecord, Evaluator, GroundTruth, GtAnnotation,
    GtCategory, GtImage, IouType, Rle, SummaryBuffer,
};

fn ground_truth_one_box() -> GroundTruth {
    GroundTruth {
        images: vec![GtImage {
            id: 0,
            height: 4,
            width: 4,
        }],
        annotations: vec![GtAnnotation {
            id: 1,
            image_id: 0,
            category_id: 1,
            bbox: [10.0, 10.0, 10.0, 10.0],
            segmentation: Some(Rle {
                size: [4, 4],
                counts: vec![5, 2, 2, 2, 5],
            }),
        }],
        categories: vec![GtCategory {
            id: 1,
            name: "polyp".to_owned(),
        }],
    }
}

fn record_matching_gt() -> CocoRecord {
    CocoRecord {
        image_id: 0,
        category_id: 1,
        bbox: [10.0, 10.0, 10.0, 10.0],
        score: 0.9,
        segmentation: Some(Rle {
            size: [4, 4],
            counts: vec![5, 2, 2, 2, 5],
        }),
    }
}

fn summarize(evaluator: &mut CocoEvaluator) -> Result<SummaryBuffer> {
    let mut summary = SummaryBuffer::new();
    evaluator.summarize(&mut summary)?;
    Ok(summary)
}

#[test]
fn perfect_detection_scores_full_ap() -> Result<()> {
    let ground_truth = ground_truth_one_box();
    let mut evaluator = CocoEvaluator::new(&ground_truth, &[IouType::Bbox, IouType::Segm])?;
    evaluator.accumulate(&[record_matching_gt()]);

    let summary = summarize(&mut evaluator)?;
    let ap_values = summary.ap_values()?;
    assert_eq!(ap_values.bbox_ap, Some(1.0));
    assert_eq!(ap_values.mask_ap, Some(1.0));
    Ok(())
}

#[test]
fn missed_ground_truth_halves_recall() -> Result<()> {
    let mut ground_truth = ground_truth_one_box();
    ground_truth.annotations.push(GtAnnotation {
        id: 2,
        image_id: 0,
        category_id: 1,
        bbox: [30.0, 30.0, 10.0, 10.0],
        segmentation: None,
    });

    let mut evaluator = CocoEvaluator::new(&ground_truth, &[IouType::Bbox])?;
    evaluator.accumulate(&[record_matching_gt()]);

    let summary = summarize(&mut evaluator)?;
    let ap_values = summary.ap_values()?;
    // precision 1.0 up to recall 0.5: 51 of 101 interpolation points
    assert!(abs_diff_eq!(
        ap_values.bbox_ap.unwrap(),
        0.505,
        epsilon = 1e-3
    ));
    Ok(())
}

#[test]
fn false_positive_lowers_precision() -> Result<()> {
    let ground_truth = ground_truth_one_box();
    let mut evaluator = CocoEvaluator::new(&ground_truth, &[IouType::Bbox])?;
    evaluator.accumulate(&[
        record_matching_gt(),
        CocoRecord {
            image_id: 0,
            category_id: 1,
            bbox: [30.0, 30.0, 5.0, 5.0],
            score: 0.95,
            segmentation: None,
        },
    ]);

    let summary = summarize(&mut evaluator)?;
    let ap_values = summary.ap_values()?;
    // the false positive outranks the true positive, capping precision at 0.5
    assert!(abs_diff_eq!(
        ap_values.bbox_ap.unwrap(),
        0.5,
        epsilon = 1e-3
    ));
    Ok(())
}

#[test]
fn detection_without_mask_misses_segm_task() -> Result<()> {
    let ground_truth = ground_truth_one_box();
    let mut evaluator = CocoEvaluator::new(&ground_truth, &[IouType::Segm])?;
    let mut record = record_matching_gt();
    record.segmentation = None;
    evaluator.accumulate(&[record]);

    let summary = summarize(&mut evaluator)?;
    let ap_values = summary.ap_values()?;
    assert_eq!(ap_values.mask_ap, Some(0.0));
    Ok(())
}

#[test]
fn results_roundtrip_and_truncation() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("results.json");

    let records: Vec<_> = (0..3)
        .map(|index| CocoRecord {
            image_id: index,
            category_id: 1,
            bbox: [0.0, 0.0, 1.0, 1.0],
            score: 0.5,
            segmentation: None,
        })
        .collect();
    save_results(&records, &path)?;
    assert_eq!(load_results(&path)?.len(), 3);

    save_results(&records[..1], &path)?;
    let reloaded = load_results(&path)?;
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].image_id, 0);
    Ok(())
}

#[test]
fn ground_truth_opens_from_json() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("annotations.json");
    let text = serde_json::to_string(&ground_truth_one_box())?;
    std::fs::write(&path, text)?;

    let ground_truth = GroundTruth::open(&path)?;
    assert_eq!(ground_truth.images.len(), 1);
    assert_eq!(ground_truth.annotations.len(), 1);
    assert_eq!(ground_truth.categories[0].name, "polyp");
    Ok(())
}
