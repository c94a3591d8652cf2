use table_gallery::{
    Args, AttributeKind, BoundsMode, ColumnSlot, FilterSet, GalleryConfig, GalleryError, Pager,
    RowId, Table, ThumbnailCache, Value,
};
use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use serial_test::serial;

fn table_from(csv: &str) -> Table {
    Table::from_reader(csv.as_bytes(), PathBuf::from("memory.csv")).unwrap()
}

const SAMPLE: &str = "\
,dir,file,score,kind,notes
0,/data/Beach,sunset.png,0.25,landscape,
1,/data/Beach,crab.PNG,0.75,animal,small
2,/data/Forest,sunset.png,0.5,landscape,
3,/data/forest,owl.jpg,,animal,night
4,/data/City,tower.jpg,0.9,,
";

#[cfg(test)]
mod cli_args_tests {
    use super::*;

    #[test]
    fn test_no_table_message_tells_user_what_to_do() {
        let message = GalleryError::NoTableSelected.to_string();

        assert!(message.starts_with("No table selected"));
        assert!(message.contains("--table"));
    }

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(["table-gallery"]).unwrap();

        assert_eq!(args.table, None);
        assert_eq!(args.thumbnail_size, 120);
        assert_eq!(args.rows, 4);
        assert_eq!(args.cols, 5);
        assert_eq!(args.cache_capacity, 300);
        assert_eq!(args.cache_max_age, 900);
        assert!(!args.unit_sliders);
        assert!(!args.debug);
    }

    #[test]
    fn test_args_custom_values() {
        let args = Args::try_parse_from([
            "table-gallery",
            "--table", "/home/user/images.csv",
            "--thumbnail-size", "96",
            "--rows", "3",
            "--cols", "6",
            "--cache-capacity", "50",
            "--cache-max-age", "60",
            "--unit-sliders",
            "--debug",
        ]).unwrap();

        assert_eq!(args.table, Some(PathBuf::from("/home/user/images.csv")));
        assert_eq!(args.thumbnail_size, 96);
        assert_eq!(args.rows, 3);
        assert_eq!(args.cols, 6);
        assert_eq!(args.cache_capacity, 50);
        assert_eq!(args.cache_max_age, 60);
        assert!(args.unit_sliders);
        assert!(args.debug);
    }

    #[test]
    fn test_args_short_table_flag() {
        let args = Args::try_parse_from(["table-gallery", "-t", "list.csv"]).unwrap();
        assert_eq!(args.table, Some(PathBuf::from("list.csv")));
    }

    #[test]
    fn test_args_invalid_thumbnail_size() {
        let result = Args::try_parse_from(["table-gallery", "--thumbnail-size", "big"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_from_args() {
        let args = Args::try_parse_from(["table-gallery", "--rows", "2", "--cols", "3", "--unit-sliders"]).unwrap();
        let config = GalleryConfig::from_args(&args).unwrap();

        assert_eq!(config.layout.page_size(), 6);
        assert_eq!(config.cache_max_age, Duration::from_secs(900));
        assert_eq!(config.bounds, BoundsMode::Unit);
    }

    #[test]
    fn test_config_rejects_empty_grid() {
        let args = Args::try_parse_from(["table-gallery", "--rows", "0"]).unwrap();
        let result = GalleryConfig::from_args(&args);
        assert!(matches!(result, Err(GalleryError::InvalidConfig(_))));
    }
}

#[cfg(test)]
mod table_tests {
    use super::*;

    #[test]
    fn test_columns_are_partitioned_at_load() {
        let table = table_from(SAMPLE);
        let schema = table.schema();

        let numeric: Vec<&str> = schema.numeric_columns().map(|(_, name)| name).collect();
        let categorical: Vec<&str> = schema.categorical_columns().map(|(_, name)| name).collect();

        assert_eq!(numeric, vec!["score"]);
        assert_eq!(categorical, vec!["kind", "notes"]);

        let index_column = &schema.attributes()[0];
        assert_eq!(index_column.name, "Unnamed: 0");
        assert_eq!(index_column.kind, AttributeKind::Ignored);
    }

    #[test]
    fn test_na_tokens_keep_column_numeric() {
        let table = table_from(
            "dir,file,score,kind\na,1.png,0.5,cat\nb,2.png,NA,NA\nc,3.png,0.7,dog\nd,4.png,null,None\n",
        );
        let schema = table.schema();

        let numeric: Vec<&str> = schema.numeric_columns().map(|(_, name)| name).collect();
        assert_eq!(numeric, vec!["score"]);

        let (score, _) = schema.numeric_columns().next().unwrap();
        assert_eq!(table.numeric_range(score), Some((0.5, 0.7)));
        assert_eq!(table.value(RowId(1), "score"), Some(&Value::Missing));

        let (kind, _) = schema.categorical_columns().next().unwrap();
        assert_eq!(table.categories(kind), vec!["cat", "dog"]);
    }

    #[test]
    fn test_mark_column_added_when_absent() {
        let table = table_from(SAMPLE);

        assert_eq!(table.schema().layout().last(), Some(&ColumnSlot::Mark));
        assert_eq!(table.schema().headers().last(), Some(&"__marked__"));
        assert!(table.rows().iter().all(|row| !row.marked));
    }

    #[test]
    fn test_existing_marks_are_read() {
        let table = table_from("dir,file,__marked__\na,1.png,True\nb,2.png,False\nc,3.png,true\n");

        assert_eq!(table.marked_ids(), vec![RowId(0), RowId(2)]);
        assert_eq!(table.schema().headers(), vec!["dir", "file", "__marked__"]);
    }

    #[test]
    fn test_missing_required_columns() {
        let result = Table::from_reader("dir,name\na,b\n".as_bytes(), PathBuf::from("x.csv"));

        match result {
            Err(GalleryError::MissingColumns { missing }) => assert_eq!(missing, vec!["file".to_owned()]),
            other => panic!("expected MissingColumns, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_row_identity_follows_load_order() {
        let table = table_from(SAMPLE);

        for (index, row) in table.rows().iter().enumerate() {
            assert_eq!(row.id, RowId(index));
        }
        assert_eq!(table.row(RowId(1)).unwrap().file, "crab.PNG");
        assert_eq!(table.path(RowId(0)), Some(PathBuf::from("/data/Beach/sunset.png")));
    }

    #[test]
    fn test_values_keep_their_kind() {
        let table = table_from(SAMPLE);

        assert_eq!(table.value(RowId(0), "score").and_then(Value::as_number), Some(0.25));
        assert_eq!(table.value(RowId(3), "score"), Some(&Value::Missing));
        assert_eq!(table.value(RowId(1), "kind").and_then(Value::as_text), Some("animal"));
        assert_eq!(table.value(RowId(4), "kind"), Some(&Value::Missing));
    }

    #[test]
    fn test_categories_and_numeric_range() {
        let table = table_from(SAMPLE);
        let kind = table.schema().column_index("kind").unwrap();
        let score = table.schema().column_index("score").unwrap();

        assert_eq!(table.categories(kind), vec!["animal".to_owned(), "landscape".to_owned()]);
        assert_eq!(table.numeric_range(score), Some((0.25, 0.9)));
    }

    #[test]
    fn test_mark_operations() {
        let mut table = table_from(SAMPLE);

        assert_eq!(table.toggle_marked(RowId(3)), Some(true));
        table.mark_all(&[RowId(0), RowId(1)]);
        assert_eq!(table.marked_ids(), vec![RowId(0), RowId(1), RowId(3)]);
        assert_eq!(table.marked_count(), 3);

        assert_eq!(table.toggle_marked(RowId(3)), Some(false));
        table.clear_marks();
        assert_eq!(table.marked_count(), 0);
        assert_eq!(table.toggle_marked(RowId(99)), None);
    }

    #[test]
    #[serial]
    fn test_load_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("images.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let table = Table::load(&path).unwrap();

        assert_eq!(table.len(), 5);
        assert_eq!(table.name(), "images.csv");
        assert_eq!(table.source(), path.as_path());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Table::load(std::path::Path::new("/nonexistent/table.csv"));
        assert!(matches!(result, Err(GalleryError::Io(_))));
    }
}

#[cfg(test)]
mod cache_tests {
    use super::*;

    #[test]
    fn test_capacity_keeps_most_recently_touched() {
        let capacity = 3;
        let mut cache = ThumbnailCache::new(capacity);
        let start = Instant::now();

        for i in 0..capacity {
            cache.put_at(&format!("img{}", i), i, start);
        }
        // Touching img0 makes img1 the least recently used entry, even though
        // every timestamp is identical.
        assert_eq!(cache.get_at("img0", start), Some(&0));

        cache.put_at("img3", 3, start);
        cache.put_at("img4", 4, start);

        assert_eq!(cache.len(), capacity);
        assert!(cache.contains("img0"));
        assert!(cache.contains("img3"));
        assert!(cache.contains("img4"));
        assert!(!cache.contains("img1"));
        assert!(!cache.contains("img2"));
        assert_eq!(cache.keys(), vec!["img4", "img3", "img0"]);
    }

    #[test]
    fn test_overflow_by_k_leaves_exactly_n() {
        let mut cache = ThumbnailCache::new(10);
        for i in 0..25 {
            cache.put(&format!("path/{}", i), i);
        }

        assert_eq!(cache.len(), 10);
        for i in 15..25 {
            assert!(cache.contains(&format!("path/{}", i)), "missing path/{}", i);
        }
    }

    #[test]
    fn test_get_miss_does_not_insert() {
        let mut cache: ThumbnailCache<u32> = ThumbnailCache::new(4);

        assert!(cache.get("absent.png").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_unused_drops_idle_entries() {
        let mut cache = ThumbnailCache::new(10);
        let start = Instant::now();
        let max_age = Duration::from_secs(900);

        cache.put_at("old", 1, start);
        cache.put_at("fresh", 2, start);
        cache.get_at("fresh", start + Duration::from_secs(600));

        let purged = cache.purge_unused_at(max_age, start + Duration::from_secs(1000));

        assert_eq!(purged, 1);
        assert!(!cache.contains("old"));
        assert!(cache.contains("fresh"));
    }

    #[test]
    fn test_purge_ignores_recency_rank() {
        let mut cache = ThumbnailCache::new(10);
        let start = Instant::now();

        cache.put_at("a", 1, start + Duration::from_secs(50));
        // Most recently used, but stamped earlier.
        cache.put_at("b", 2, start);

        cache.purge_unused_at(Duration::from_secs(100), start + Duration::from_secs(120));

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn test_entry_exactly_at_threshold_survives() {
        let mut cache = ThumbnailCache::new(10);
        let start = Instant::now();
        cache.put_at("edge", 1, start);

        cache.purge_unused_at(Duration::from_secs(900), start + Duration::from_secs(900));

        assert!(cache.contains("edge"));
    }
}

#[cfg(test)]
mod filter_tests {
    use super::*;

    fn files(table: &Table, view: &[RowId]) -> Vec<String> {
        view.iter().map(|id| table.row(*id).unwrap().file.clone()).collect()
    }

    #[test]
    fn test_default_filters_keep_everything() {
        let table = table_from(SAMPLE);
        let filters = FilterSet::for_table(&table, BoundsMode::Data);

        assert!(filters.numeric.iter().all(|f| !f.is_active()));
        assert_eq!(filters.apply(&table).len(), table.len());
    }

    #[test]
    fn test_view_is_ordered_subsequence_and_idempotent() {
        let table = table_from(SAMPLE);
        let mut filters = FilterSet::for_table(&table, BoundsMode::Data);
        filters.dir_query = "beach".to_owned();

        let first = filters.apply(&table);
        let second = filters.apply(&table);

        assert_eq!(first, second);
        assert!(first.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(first.iter().all(|id| table.row(*id).is_some()));
    }

    #[test]
    fn test_text_queries_are_case_insensitive_and_independent() {
        let table = table_from(SAMPLE);
        let mut filters = FilterSet::for_table(&table, BoundsMode::Data);

        filters.dir_query = "  FOREST ".to_owned();
        assert_eq!(files(&table, &filters.apply(&table)), vec!["sunset.png", "owl.jpg"]);

        filters.file_query = "sunset".to_owned();
        assert_eq!(files(&table, &filters.apply(&table)), vec!["sunset.png"]);

        filters.dir_query.clear();
        filters.file_query = "png".to_owned();
        assert_eq!(files(&table, &filters.apply(&table)), vec!["sunset.png", "crab.PNG", "sunset.png"]);
    }

    #[test]
    fn test_numeric_range_excludes_missing_when_active() {
        let table = table_from(SAMPLE);
        let mut filters = FilterSet::for_table(&table, BoundsMode::Data);
        filters.numeric[0].min = 0.5;

        assert_eq!(files(&table, &filters.apply(&table)), vec!["crab.PNG", "sunset.png", "tower.jpg"]);
    }

    #[test]
    fn test_categorical_selection_and_all() {
        let table = table_from(SAMPLE);
        let mut filters = FilterSet::for_table(&table, BoundsMode::Data);
        let kind = filters.categorical.iter().position(|f| f.name == "kind").unwrap();

        filters.categorical[kind].selected = Some("animal".to_owned());
        assert_eq!(files(&table, &filters.apply(&table)), vec!["crab.PNG", "owl.jpg"]);

        filters.categorical[kind].selected = None;
        assert_eq!(filters.apply(&table).len(), 5);
    }

    #[test]
    fn test_unit_bounds_always_filter() {
        let table = table_from("dir,file,size\na,1.png,0.5\na,2.png,12\na,3.png,\n");
        let filters = FilterSet::for_table(&table, BoundsMode::Unit);

        assert_eq!(filters.numeric[0].extent, (0.0, 1.0));
        assert!(filters.numeric[0].is_active());
        assert_eq!(files(&table, &filters.apply(&table)), vec!["1.png"]);
    }

    #[test]
    fn test_hide_marked_after_marking_everything_is_empty() {
        let mut table = table_from(SAMPLE);
        let mut filters = FilterSet::for_table(&table, BoundsMode::Data);
        filters.dir_query = "data".to_owned();

        let view = filters.apply(&table);
        table.mark_all(&view);
        filters.hide_marked = true;

        assert!(filters.apply(&table).is_empty());
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let table = table_from(SAMPLE);
        let initial = FilterSet::for_table(&table, BoundsMode::Data);
        let mut filters = initial.clone();
        filters.dir_query = "x".to_owned();
        filters.numeric[0].max = 0.3;
        filters.categorical[0].selected = Some("animal".to_owned());
        filters.hide_marked = true;

        filters.reset();

        assert_eq!(filters, initial);
    }

    #[test]
    fn test_same_file_view() {
        let table = table_from(SAMPLE);
        let view = table_gallery::filter::same_file_view(&table, "sunset.png");
        assert_eq!(view, vec![RowId(0), RowId(2)]);
    }
}

#[cfg(test)]
mod paging_tests {
    use super::*;

    #[test]
    fn test_page_count() {
        let pager = Pager::new(20);
        let cases = vec![(0, 1), (1, 1), (20, 1), (21, 2), (47, 3), (60, 3)];

        for (len, expected) in cases {
            assert_eq!(pager.page_count(len), expected, "Failed for len {}", len);
        }
    }

    #[test]
    fn test_prev_at_first_page_is_noop() {
        let mut pager = Pager::new(20);
        assert!(!pager.prev());
        assert_eq!(pager.page(), 0);
    }

    #[test]
    fn test_next_at_last_page_is_noop() {
        let mut pager = Pager::new(20);
        assert!(pager.next(47));
        assert!(pager.next(47));
        assert!(!pager.next(47));
        assert_eq!(pager.page(), 2);
        assert_eq!(pager.range(47), 40..47);
        assert_eq!(pager.label(47), "Page 3 / 3");
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut pager = Pager::new(20);
        pager.next(47);
        pager.next(47);

        pager.clamp(5);
        assert_eq!(pager.page(), 0);
        assert_eq!(pager.range(5), 0..5);

        pager.clamp(0);
        assert_eq!(pager.range(0), 0..0);
        assert_eq!(pager.label(0), "Page 1 / 1");
    }
}

#[cfg(test)]
mod thumbnail_tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use table_gallery::gallery::{create_thumbnail, decode_thumbnail, GridLayout};

    #[test]
    fn test_create_thumbnail_square() {
        let test_image = DynamicImage::ImageRgb8(RgbImage::new(100, 100));

        let thumbnail = create_thumbnail(test_image, 50);

        assert_eq!(thumbnail.size, [50, 50]);
        assert_eq!(thumbnail.pixels.len(), 50 * 50);
    }

    #[test]
    fn test_create_thumbnail_keeps_aspect_ratio() {
        let test_image = DynamicImage::ImageRgb8(RgbImage::new(240, 120));

        let thumbnail = create_thumbnail(test_image, 120);

        assert_eq!(thumbnail.size, [120, 60]);
    }

    #[test]
    fn test_create_thumbnail_never_enlarges() {
        let test_image = DynamicImage::ImageRgb8(RgbImage::new(30, 20));

        let thumbnail = create_thumbnail(test_image, 120);

        assert_eq!(thumbnail.size, [30, 20]);
    }

    #[test]
    #[serial]
    fn test_decode_thumbnail_from_png() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("large.png");
        RgbImage::new(1200, 600).save(&path).unwrap();

        let thumbnail = decode_thumbnail(&path, 120).unwrap();

        assert!(thumbnail.size[0] <= 120 && thumbnail.size[1] <= 120);
        assert_eq!(thumbnail.size[0], 120);
    }

    #[test]
    fn test_decode_thumbnail_missing_file() {
        let result = decode_thumbnail(std::path::Path::new("/nonexistent/image.png"), 120);
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_decode_thumbnail_non_image_file() {
        let temp_dir = TempDir::new().unwrap();
        let text_file = temp_dir.path().join("notes.png");
        std::fs::write(&text_file, "This is not an image").unwrap();

        let result = decode_thumbnail(&text_file, 120);
        assert!(result.is_err());
    }

    #[test]
    fn test_grid_layout_is_row_major() {
        let layout = GridLayout::new(4, 5);

        assert_eq!(layout.page_size(), 20);
        assert_eq!(layout.position(0), (0, 0));
        assert_eq!(layout.position(4), (0, 4));
        assert_eq!(layout.position(5), (1, 0));
        assert_eq!(layout.position(19), (3, 4));
    }
}

#[cfg(test)]
mod export_tests {
    use super::*;
    use table_gallery::export::{confirm_save_message, export_marked, save_table};

    #[test]
    #[serial]
    fn test_save_table_preserves_column_order_and_marks() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.csv");
        let mut table = table_from("file,score,dir\n1.png,0.5,a\n2.png,1.0,b\n");
        table.set_marked(RowId(1), true);

        save_table(&table, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec![
            "file,score,dir,__marked__",
            "1.png,0.5,a,False",
            "2.png,1.0,b,True",
        ]);
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_save_table_keeps_existing_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shared.csv");
        std::fs::write(&path, "dir,file\na,1.png\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut table = Table::load(&path).unwrap();
        table.set_marked(RowId(0), true);
        save_table(&table, &path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
        assert_eq!(Table::load(&path).unwrap().marked_ids(), vec![RowId(0)]);
    }

    #[test]
    #[serial]
    fn test_save_into_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("no_such_dir").join("out.csv");
        let table = table_from(SAMPLE);

        assert!(matches!(save_table(&table, &path), Err(GalleryError::Io(_))));
        assert!(!path.exists());
    }

    #[test]
    #[serial]
    fn test_export_into_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("no_such_dir").join("marked.txt");
        let mut table = table_from(SAMPLE);
        table.set_marked(RowId(2), true);

        assert!(matches!(export_marked(&table, &path), Err(GalleryError::Io(_))));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_failed_save_leaves_original_file() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        let path = locked.join("table.csv");
        let original = "dir,file,__marked__\na,1.png,False\nb,2.png,True\n";
        std::fs::write(&path, original).unwrap();

        let mut table = Table::load(&path).unwrap();
        table.set_marked(RowId(0), true);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not stop a privileged user, nothing to check then.
        let writable = std::fs::File::create(locked.join("check")).is_ok();
        if !writable {
            assert!(matches!(save_table(&table, &path), Err(GalleryError::Io(_))));
            assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
            assert_eq!(table.marked_ids(), vec![RowId(0), RowId(1)]);
        }

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    #[serial]
    fn test_saved_table_reloads_with_marks() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("roundtrip.csv");
        let mut table = table_from(SAMPLE);
        table.mark_all(&[RowId(1), RowId(4)]);

        save_table(&table, &path).unwrap();
        let reloaded = Table::load(&path).unwrap();

        assert_eq!(reloaded.marked_ids(), vec![RowId(1), RowId(4)]);
        assert_eq!(reloaded.schema().headers(), table.schema().headers());
        assert_eq!(reloaded.schema().headers()[0], "Unnamed: 0");
    }

    #[test]
    #[serial]
    fn test_export_marked_writes_paths_in_table_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("marked.txt");
        let mut table = table_from(SAMPLE);
        table.mark_all(&[RowId(3), RowId(0)]);

        let count = export_marked(&table, &path).unwrap();

        assert_eq!(count, 2);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "/data/Beach/sunset.png\n/data/forest/owl.jpg\n");
    }

    #[test]
    #[serial]
    fn test_export_marked_refuses_without_marks() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("marked.txt");
        let table = table_from(SAMPLE);

        let result = export_marked(&table, &path);

        assert!(matches!(result, Err(GalleryError::NothingMarked)));
        assert!(!path.exists());
    }

    #[test]
    fn test_confirm_message_names_marked_count() {
        let mut table = table_from(SAMPLE);
        table.mark_all(&[RowId(0), RowId(1), RowId(2)]);

        let message = confirm_save_message(&table);

        assert!(message.contains("memory.csv"));
        assert!(message.contains("Marked files: 3"));
    }
}
